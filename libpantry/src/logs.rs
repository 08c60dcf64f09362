//! The append-only logs kept next to the distribution ledger: donations
//! received, spoiled food, menstrual products handed out and the anonymous
//! survey. Forms are validated as a whole; a form with a missing required
//! field is rejected and nothing is written.

use crate::error::PantryError;
use crate::quantity::Quantity;
use crate::table::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Choice that asks for an accompanying free-text detail field.
pub const OTHER_CHOICE: &str = "Other";

/// Separator used when a multi-select answer is stored in one column.
pub const MULTI_SELECT_SEPARATOR: &str = ", ";

fn join(choices: &[String]) -> String {
    choices
        .iter()
        .map(|choice| choice.trim())
        .filter(|choice| !choice.is_empty())
        .collect::<Vec<_>>()
        .join(MULTI_SELECT_SEPARATOR)
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn picks_other(choices: &[String]) -> bool {
    choices
        .iter()
        .any(|choice| choice.trim().eq_ignore_ascii_case(OTHER_CHOICE))
}

/// Collects the names of missing required fields.
#[derive(Default)]
struct Required(Vec<&'static str>);

impl Required {
    fn text(&mut self, field: &'static str, value: &str) -> &mut Self {
        if blank(value) {
            self.0.push(field);
        }
        self
    }

    fn choices(&mut self, field: &'static str, values: &[String]) -> &mut Self {
        if values.iter().all(|value| blank(value)) {
            self.0.push(field);
        }
        self
    }

    fn detail_if(&mut self, condition: bool, field: &'static str, value: &str) -> &mut Self {
        if condition {
            self.text(field, value);
        }
        self
    }

    fn finish(&mut self) -> Result<(), PantryError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(PantryError::MissingFields(std::mem::take(&mut self.0)))
        }
    }
}

/// Weight fields accept the same notation as quantities. Blank weights are
/// reported as missing rather than read as zero.
fn weight(field: &'static str, raw: &str) -> Result<Quantity, PantryError> {
    if blank(raw) {
        return Err(PantryError::MissingFields(vec![field]));
    }
    raw.parse()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DonationForm {
    pub product_name: String,
    pub weight_lbs: String,
    pub provider: String,
    pub donor_details: String,
    pub contents: Vec<String>,
    pub other_contents_details: String,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DonationEntry {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Donation Weight (lbs)")]
    pub weight_lbs: Quantity,
    #[serde(rename = "Donation Provider")]
    pub provider: String,
    #[serde(rename = "Donor Details")]
    pub donor_details: String,
    #[serde(rename = "Contents")]
    pub contents: String,
    #[serde(rename = "Other Contents Details")]
    pub other_contents_details: String,
    #[serde(rename = "Additional Notes")]
    pub notes: String,
}

impl Record for DonationEntry {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "Product Name",
        "Donation Weight (lbs)",
        "Donation Provider",
        "Donor Details",
        "Contents",
        "Other Contents Details",
        "Additional Notes",
    ];
}

impl DonationForm {
    pub fn into_entry(self, date: NaiveDate) -> Result<DonationEntry, PantryError> {
        Required::default()
            .text("Product Name", &self.product_name)
            .text("Donation Weight (lbs)", &self.weight_lbs)
            .text("Donation Provider", &self.provider)
            .detail_if(
                self.provider.trim().eq_ignore_ascii_case(OTHER_CHOICE),
                "Donor Details",
                &self.donor_details,
            )
            .choices("Contents", &self.contents)
            .detail_if(
                picks_other(&self.contents),
                "Other Contents Details",
                &self.other_contents_details,
            )
            .finish()?;

        Ok(DonationEntry {
            date,
            product_name: self.product_name.trim().to_string(),
            weight_lbs: weight("Donation Weight (lbs)", &self.weight_lbs)?,
            provider: self.provider.trim().to_string(),
            donor_details: self.donor_details.trim().to_string(),
            contents: join(&self.contents),
            other_contents_details: self.other_contents_details.trim().to_string(),
            notes: self.notes.trim().to_string(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpoilageForm {
    pub weight_lbs: String,
    pub sources: Vec<String>,
    pub source_details: String,
    pub contents: Vec<String>,
    pub contents_details: String,
    pub contents_notes: String,
    pub destinations: Vec<String>,
    pub destination_details: String,
    pub reasons: Vec<String>,
    pub reasons_details: String,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpoilageEntry {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Total Item Weight (lbs.)")]
    pub weight_lbs: Quantity,
    #[serde(rename = "Source of Items")]
    pub sources: String,
    #[serde(rename = "Source Details")]
    pub source_details: String,
    #[serde(rename = "Contents")]
    pub contents: String,
    #[serde(rename = "Contents Details")]
    pub contents_details: String,
    #[serde(rename = "Additional Notes about Contents")]
    pub contents_notes: String,
    #[serde(rename = "Destination")]
    pub destinations: String,
    #[serde(rename = "Destination Details")]
    pub destination_details: String,
    #[serde(rename = "Reasons")]
    pub reasons: String,
    #[serde(rename = "Reasons Details")]
    pub reasons_details: String,
    #[serde(rename = "Additional Notes")]
    pub notes: String,
}

impl Record for SpoilageEntry {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "Total Item Weight (lbs.)",
        "Source of Items",
        "Source Details",
        "Contents",
        "Contents Details",
        "Additional Notes about Contents",
        "Destination",
        "Destination Details",
        "Reasons",
        "Reasons Details",
        "Additional Notes",
    ];
}

impl SpoilageForm {
    pub fn into_entry(self, date: NaiveDate) -> Result<SpoilageEntry, PantryError> {
        Required::default()
            .text("Total Item Weight (lbs.)", &self.weight_lbs)
            .choices("Source of Items", &self.sources)
            .detail_if(picks_other(&self.sources), "Source Details", &self.source_details)
            .choices("Contents", &self.contents)
            .detail_if(
                picks_other(&self.contents),
                "Contents Details",
                &self.contents_details,
            )
            .choices("Destination", &self.destinations)
            .detail_if(
                picks_other(&self.destinations),
                "Destination Details",
                &self.destination_details,
            )
            .choices("Reasons", &self.reasons)
            .detail_if(picks_other(&self.reasons), "Reasons Details", &self.reasons_details)
            .finish()?;

        Ok(SpoilageEntry {
            date,
            weight_lbs: weight("Total Item Weight (lbs.)", &self.weight_lbs)?,
            sources: join(&self.sources),
            source_details: self.source_details.trim().to_string(),
            contents: join(&self.contents),
            contents_details: self.contents_details.trim().to_string(),
            contents_notes: self.contents_notes.trim().to_string(),
            destinations: join(&self.destinations),
            destination_details: self.destination_details.trim().to_string(),
            reasons: join(&self.reasons),
            reasons_details: self.reasons_details.trim().to_string(),
            notes: self.notes.trim().to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MenstrualEntry {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Product Type")]
    pub product_type: String,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
}

impl Record for MenstrualEntry {
    const HEADERS: &'static [&'static str] = &["Date", "Brand", "Product Type", "Quantity"];
}

impl MenstrualEntry {
    pub fn new(
        date: NaiveDate,
        brand: &str,
        product_type: &str,
        quantity: u32,
    ) -> Result<MenstrualEntry, PantryError> {
        Required::default()
            .text("Brand", brand)
            .text("Product Type", product_type)
            .finish()?;

        Ok(MenstrualEntry {
            date,
            brand: brand.trim().to_string(),
            product_type: product_type.trim().to_string(),
            quantity,
        })
    }
}

/// Answers to the anonymous survey. Every question may be skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurveyForm {
    pub age: String,
    pub gender_identities: Vec<String>,
    pub racial_backgrounds: Vec<String>,
    pub financial_backgrounds: Vec<String>,
    pub annual_income: String,
    pub plan_b_barriers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Gender Identity")]
    pub gender_identity: String,
    #[serde(rename = "Racial Background")]
    pub racial_background: String,
    #[serde(rename = "Financial Background")]
    pub financial_background: String,
    #[serde(rename = "Annual Income")]
    pub annual_income: String,
    #[serde(rename = "Barrier From Obtaining Plan B")]
    pub plan_b_barriers: String,
}

impl Record for SurveyResponse {
    const HEADERS: &'static [&'static str] = &[
        "Date",
        "Age",
        "Gender Identity",
        "Racial Background",
        "Financial Background",
        "Annual Income",
        "Barrier From Obtaining Plan B",
    ];
}

impl SurveyForm {
    pub fn into_response(self, date: NaiveDate) -> SurveyResponse {
        SurveyResponse {
            date,
            age: self.age.trim().to_string(),
            gender_identity: join(&self.gender_identities),
            racial_background: join(&self.racial_backgrounds),
            financial_background: join(&self.financial_backgrounds),
            annual_income: self.annual_income.trim().to_string(),
            plan_b_barriers: join(&self.plan_b_barriers),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PantryError;
    use crate::logs::{
        DonationEntry, DonationForm, MenstrualEntry, SpoilageEntry, SpoilageForm, SurveyForm,
        SurveyResponse,
    };
    use crate::quantity::Quantity;
    use crate::table::Record;
    use chrono::NaiveDate;
    use serde::Serialize;

    use anyhow::{anyhow, Result};

    fn date() -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 11, 4).ok_or(anyhow!("invalid date"))
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn header_line<R: Record + Serialize>(row: &R) -> Result<String> {
        let mut buf = Vec::new();
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.serialize(row)?;
        writer.flush()?;
        drop(writer);
        let written = String::from_utf8(buf)?;
        Ok(written.lines().next().unwrap_or_default().to_string())
    }

    fn donation_form() -> DonationForm {
        DonationForm {
            product_name: "Canned soup".to_string(),
            weight_lbs: "12 ".to_string(),
            provider: "Safeway".to_string(),
            contents: strings(&["Canned/Jarred Foods", "Dry/Baking Goods"]),
            ..Default::default()
        }
    }

    #[test]
    fn donation_form_becomes_entry() -> Result<()> {
        let entry = donation_form().into_entry(date()?)?;
        assert_eq!(entry.weight_lbs, Quantity::new(12f64));
        assert_eq!(entry.contents, "Canned/Jarred Foods, Dry/Baking Goods");
        Ok(())
    }

    #[test]
    fn donation_form_reports_every_missing_field() -> Result<()> {
        let form = DonationForm {
            provider: "Other".to_string(),
            contents: strings(&["Other"]),
            ..Default::default()
        };
        assert_eq!(
            form.into_entry(date()?),
            Err(PantryError::MissingFields(vec![
                "Product Name",
                "Donation Weight (lbs)",
                "Donor Details",
                "Other Contents Details",
            ]))
        );
        Ok(())
    }

    #[test]
    fn donation_weight_must_parse() -> Result<()> {
        let form = DonationForm {
            weight_lbs: "heavy".to_string(),
            ..donation_form()
        };
        assert_eq!(
            form.into_entry(date()?),
            Err(PantryError::InvalidQuantity("heavy".to_string()))
        );
        Ok(())
    }

    #[test]
    fn spoilage_form_requires_details_for_other() -> Result<()> {
        let form = SpoilageForm {
            weight_lbs: "3/4".to_string(),
            sources: strings(&["Walk-in fridge"]),
            contents: strings(&["Produce"]),
            destinations: strings(&["Other"]),
            reasons: strings(&["Expired", "Moldy"]),
            ..Default::default()
        };
        assert_eq!(
            form.clone().into_entry(date()?),
            Err(PantryError::MissingFields(vec!["Destination Details"]))
        );

        let entry = SpoilageForm {
            destination_details: "Compost".to_string(),
            ..form
        }
        .into_entry(date()?)?;
        assert_eq!(entry.weight_lbs, Quantity::new(0.75));
        assert_eq!(entry.reasons, "Expired, Moldy");
        assert_eq!(entry.destinations, "Other");
        Ok(())
    }

    #[test]
    fn menstrual_entry_requires_brand_and_type() -> Result<()> {
        assert_eq!(
            MenstrualEntry::new(date()?, " ", "Pads", 3),
            Err(PantryError::MissingFields(vec!["Brand"]))
        );
        let entry = MenstrualEntry::new(date()?, "Always", "Pads", 3)?;
        assert_eq!(entry.quantity, 3);
        Ok(())
    }

    #[test]
    fn survey_answers_are_optional_and_flattened() -> Result<()> {
        let response = SurveyForm {
            age: "18-24".to_string(),
            gender_identities: strings(&["Woman", "Non-binary", " "]),
            plan_b_barriers: strings(&["Cost", "Distance"]),
            ..Default::default()
        }
        .into_response(date()?);

        assert_eq!(response.gender_identity, "Woman, Non-binary");
        assert_eq!(response.racial_background, "");
        assert_eq!(response.plan_b_barriers, "Cost, Distance");
        Ok(())
    }

    #[test]
    fn headers_follow_field_order() -> Result<()> {
        let donation = donation_form().into_entry(date()?)?;
        assert_eq!(header_line(&donation)?, DonationEntry::HEADERS.join(","));

        let spoilage = SpoilageEntry {
            date: date()?,
            weight_lbs: Quantity::new(1f64),
            sources: String::new(),
            source_details: String::new(),
            contents: String::new(),
            contents_details: String::new(),
            contents_notes: String::new(),
            destinations: String::new(),
            destination_details: String::new(),
            reasons: String::new(),
            reasons_details: String::new(),
            notes: String::new(),
        };
        assert_eq!(header_line(&spoilage)?, SpoilageEntry::HEADERS.join(","));

        let menstrual = MenstrualEntry::new(date()?, "Always", "Pads", 1)?;
        assert_eq!(header_line(&menstrual)?, MenstrualEntry::HEADERS.join(","));

        let survey = SurveyForm::default().into_response(date()?);
        assert_eq!(header_line(&survey)?, SurveyResponse::HEADERS.join(","));
        Ok(())
    }
}
