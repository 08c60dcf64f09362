use crate::error::PantryError;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// Label of the extra drop-down entry that lets staff type a product name.
pub const CUSTOM_PRODUCT_OPTION: &str = "Other (Custom Product)";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Produce,
    Meat,
    Dairy,
    CannedJarred,
    DryBaking,
    PersonalCare,
    Other(String),
}

impl Category {
    pub const PREDEFINED: [Category; 6] = [
        Category::Produce,
        Category::Meat,
        Category::Dairy,
        Category::CannedJarred,
        Category::DryBaking,
        Category::PersonalCare,
    ];

    pub fn label(&self) -> &str {
        match self {
            Category::Produce => "Produce",
            Category::Meat => "Meat",
            Category::Dairy => "Dairy",
            Category::CannedJarred => "Canned/Jarred Foods",
            Category::DryBaking => "Dry/Baking Goods",
            Category::PersonalCare => "Personal Care",
            Category::Other(label) => label,
        }
    }

    /// Products offered in the drop-down for this category, sorted.
    pub fn default_products(&self) -> &'static [&'static str] {
        match self {
            Category::Produce => &[
                "Apples",
                "Bananas",
                "Carrots",
                "Eggplants",
                "Onions",
                "Oranges",
                "Persimmons",
                "Potatoes",
                "Tomatoes",
                "Zucchinis",
            ],
            Category::Meat => &["Beef", "Chicken", "Eggs", "Fish (General)"],
            Category::Dairy => &["Cheese", "Milk", "Yogurt"],
            Category::CannedJarred => &["Canned Beans", "Jam", "Tomato Sauce"],
            Category::DryBaking => &["Baking Soda", "Flour", "Pasta", "Rice", "Sugar"],
            Category::PersonalCare => &["Condoms", "Floss", "Menstrual Cups", "Pads", "Tampons"],
            Category::Other(_) => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        let s = s.trim();
        Category::PREDEFINED
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(s))
            .unwrap_or_else(|| Category::Other(s.to_string()))
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::from(s.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(label) => label,
            predefined => predefined.label().to_string(),
        }
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::from(s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CountMethod {
    Individual,
    Crates,
}

impl fmt::Display for CountMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountMethod::Individual => write!(f, "Individual"),
            CountMethod::Crates => write!(f, "Crates"),
        }
    }
}

impl FromStr for CountMethod {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(CountMethod::Individual),
            "crates" | "crate" => Ok(CountMethod::Crates),
            _ => Err(PantryError::InvalidCountMethod(s.to_string())),
        }
    }
}

/// What staff picked in the product drop-down.
#[derive(Clone, Debug, PartialEq)]
pub enum ProductSelection {
    Listed(String),
    Custom(String),
}

impl ProductSelection {
    /// Build a selection from the drop-down value and the free-text field
    /// shown next to it.
    pub fn from_form(selected: &str, custom_name: Option<&str>) -> Self {
        if selected == CUSTOM_PRODUCT_OPTION {
            ProductSelection::Custom(custom_name.unwrap_or_default().trim().to_string())
        } else {
            ProductSelection::Listed(selected.trim().to_string())
        }
    }

    pub fn product_name(&self) -> Result<&str, PantryError> {
        let name = match self {
            ProductSelection::Listed(name) | ProductSelection::Custom(name) => name.as_str(),
        };
        if name.is_empty() {
            return Err(PantryError::MissingFields(vec!["Product"]));
        }
        Ok(name)
    }
}

/// Product names typed in through the custom-product path, per category.
///
/// Lives only as long as the process: a restart forgets every name. Rows
/// already written under a custom name are unaffected, they just stop showing
/// up in the end-of-day drop-down until someone logs them again.
#[derive(Debug, Default)]
pub struct CustomProductRegistry(Mutex<BTreeMap<Category, Vec<String>>>);

impl CustomProductRegistry {
    pub fn new() -> Self {
        Self(Mutex::new(BTreeMap::new()))
    }

    /// Remember `name` under `category`. Returns `false` when it is already
    /// known, either as a predefined product or an earlier custom one.
    pub fn register(&self, category: &Category, name: &str) -> bool {
        if category.default_products().iter().any(|p| *p == name) {
            return false;
        }

        let mut store = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let names = store.entry(category.clone()).or_default();
        if names.iter().any(|known| known == name) {
            return false;
        }
        names.push(name.to_string());
        true
    }

    pub fn custom_products(&self, category: &Category) -> Vec<String> {
        let store = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        store.get(category).cloned().unwrap_or_default()
    }

    /// Choices for logging a distribution: the predefined list followed by
    /// the custom-product entry.
    pub fn distribution_options(&self, category: &Category) -> Vec<String> {
        category
            .default_products()
            .iter()
            .map(|p| p.to_string())
            .chain(std::iter::once(CUSTOM_PRODUCT_OPTION.to_string()))
            .collect()
    }

    /// Choices for recording what is left at the end of the day: predefined
    /// and custom names, sorted together.
    pub fn remaining_options(&self, category: &Category) -> Vec<String> {
        let mut options: Vec<String> = category
            .default_products()
            .iter()
            .map(|p| p.to_string())
            .chain(self.custom_products(category))
            .collect();
        options.sort();
        options
    }
}
