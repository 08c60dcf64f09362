use crate::{
    access::WriteAccess,
    catalog::{Category, CountMethod, CustomProductRegistry, ProductSelection},
    config::Config,
    ledger::LedgerRow,
    logs::{
        DonationEntry, DonationForm, MenstrualEntry, SpoilageEntry, SpoilageForm, SurveyForm,
        SurveyResponse,
    },
    quantity::Quantity,
    snapshot::{self, Snapshot},
    store::LedgerStore,
    table::Table,
};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use log::{info, warn};

/// Source of "today" for every dated row.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Outcome of a distribution submission.
#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Saved(LedgerRow),
    /// Nothing was handed out, so nothing was written.
    Skipped,
}

/// Everything the pantry staff can do, wired to the tables named in
/// [`Config`].
pub struct Pantry<C: Clock = SystemClock> {
    config: Config,
    clock: C,
    store: LedgerStore,
    registry: CustomProductRegistry,
    donations: Table<DonationEntry>,
    spoilage: Table<SpoilageEntry>,
    menstrual: Table<MenstrualEntry>,
    surveys: Table<SurveyResponse>,
    menu: Snapshot,
    removed: Snapshot,
}

impl Pantry<SystemClock> {
    pub fn open(config: Config) -> Result<Self> {
        Pantry::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Pantry<C> {
    pub fn with_clock(config: Config, clock: C) -> Result<Self> {
        let store = LedgerStore::open(config.ledger_path(), config.store_options())?;
        Ok(Pantry {
            clock,
            store,
            registry: CustomProductRegistry::new(),
            donations: Table::new(config.donation_path()),
            spoilage: Table::new(config.spoilage_path()),
            menstrual: Table::new(config.menstrual_path()),
            surveys: Table::new(config.survey_path()),
            menu: Snapshot::new(config.menu_path()),
            removed: Snapshot::new(config.removed_path()),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn registry(&self) -> &CustomProductRegistry {
        &self.registry
    }

    pub fn distribution_options(&self, category: &Category) -> Vec<String> {
        self.registry.distribution_options(category)
    }

    /// Choices for the end-of-day form: predefined and registered custom
    /// names, plus every product already logged today under `category`.
    /// The ledger part survives a restart, the registry part does not.
    pub fn remaining_options(&self, category: &Category) -> Result<Vec<String>> {
        let mut options = self.registry.remaining_options(category);
        for row in self.store.rows_on(&self.today())? {
            if &row.category == category && !options.contains(&row.product) {
                options.push(row.product);
            }
        }
        options.sort();
        Ok(options)
    }

    /// Log product handed out today. A custom product name is remembered
    /// for the end-of-day form even when the quantity is zero, but a zero
    /// quantity writes nothing.
    pub fn distribute(
        &self,
        _access: &WriteAccess,
        category: Category,
        selection: &ProductSelection,
        count_method: Option<CountMethod>,
        raw_quantity: &str,
    ) -> Result<Recorded> {
        let product = selection.product_name()?;
        let quantity = Quantity::from_input(raw_quantity)?;

        if let ProductSelection::Custom(name) = selection {
            if self.registry.register(&category, name) {
                info!("registered custom product '{}' under {}", name, category);
            }
        }

        if quantity.is_zero() {
            warn!("no quantity given for '{}', nothing recorded", product);
            return Ok(Recorded::Skipped);
        }

        let row = self.store.record_distribution(
            self.today(),
            category,
            product,
            count_method,
            quantity,
        )?;
        Ok(Recorded::Saved(row))
    }

    /// Record how much of a product is left at the end of today.
    pub fn record_remaining(
        &self,
        _access: &WriteAccess,
        category: Category,
        selection: &ProductSelection,
        count_method: Option<CountMethod>,
        raw_remaining: &str,
    ) -> Result<LedgerRow> {
        let product = selection.product_name()?;
        let remaining = Quantity::from_input(raw_remaining)?;
        self.store
            .record_remaining(self.today(), category, product, count_method, remaining)
    }

    pub fn ledger(&self) -> Result<Vec<LedgerRow>> {
        self.store.rows()
    }

    pub fn ledger_on(&self, date: &NaiveDate) -> Result<Vec<LedgerRow>> {
        self.store.rows_on(date)
    }

    pub fn compact(&self, _access: &WriteAccess) -> Result<()> {
        self.store.compact()
    }

    pub fn log_donation(&self, _access: &WriteAccess, form: DonationForm) -> Result<DonationEntry> {
        let entry = form.into_entry(self.today())?;
        self.donations.append(entry.clone())?;
        Ok(entry)
    }

    pub fn donations(&self) -> Result<Vec<DonationEntry>> {
        self.donations.load()
    }

    pub fn log_spoilage(&self, _access: &WriteAccess, form: SpoilageForm) -> Result<SpoilageEntry> {
        let entry = form.into_entry(self.today())?;
        self.spoilage.append(entry.clone())?;
        Ok(entry)
    }

    pub fn spoilage(&self) -> Result<Vec<SpoilageEntry>> {
        self.spoilage.load()
    }

    pub fn log_menstrual(
        &self,
        _access: &WriteAccess,
        brand: &str,
        product_type: &str,
        quantity: u32,
    ) -> Result<MenstrualEntry> {
        let entry = MenstrualEntry::new(self.today(), brand, product_type, quantity)?;
        self.menstrual.append(entry.clone())?;
        Ok(entry)
    }

    pub fn menstrual(&self) -> Result<Vec<MenstrualEntry>> {
        self.menstrual.load()
    }

    /// Anonymous, so no write access is needed.
    pub fn record_survey(&self, form: SurveyForm) -> Result<SurveyResponse> {
        let response = form.into_response(self.today());
        self.surveys.append(response.clone())?;
        Ok(response)
    }

    pub fn surveys(&self) -> Result<Vec<SurveyResponse>> {
        self.surveys.load()
    }

    /// Replace today's removed products and rebuild the walk-in menu from
    /// them. Returns the new menu.
    pub fn regenerate_menu(&self, _access: &WriteAccess, removed: &[String]) -> Result<Vec<String>> {
        let removed: Vec<String> = removed
            .iter()
            .map(|product| product.trim().to_string())
            .filter(|product| !product.is_empty())
            .collect();
        let menu = snapshot::walk_in_menu(&removed);
        self.removed.regenerate(&removed)?;
        self.menu.regenerate(&menu)?;
        Ok(menu)
    }

    /// Today's walk-in menu. A menu written on an earlier day is rebuilt
    /// with nothing removed first.
    pub fn walk_in_menu(&self) -> Result<Vec<String>> {
        if self.menu.is_stale(self.today())? {
            warn!(
                "{} is out of date, regenerating with no removals",
                self.menu.path().display()
            );
            let menu = snapshot::walk_in_menu(&[]);
            self.removed.regenerate(Vec::<String>::new())?;
            self.menu.regenerate(&menu)?;
            return Ok(menu);
        }
        self.menu.load()
    }

    pub fn removed_products(&self) -> Result<Vec<String>> {
        self.removed.load()
    }
}

#[cfg(test)]
mod tests {
    use crate::access::{AccessGate, OpenGate, SharedSecretGate, WriteAccess};
    use crate::catalog::{Category, CountMethod, ProductSelection, CUSTOM_PRODUCT_OPTION};
    use crate::config::Config;
    use crate::error::PantryError;
    use crate::logs::{DonationForm, SurveyForm};
    use crate::quantity::Quantity;
    use crate::service::{FixedClock, Pantry, Recorded};
    use chrono::{Local, NaiveDate};

    use anyhow::{anyhow, Result};
    use std::fs;
    use std::path::Path;

    fn pantry_in(dir: &Path, date: NaiveDate) -> Result<Pantry<FixedClock>> {
        let config = Config {
            data_dir: dir.to_path_buf(),
            compact_every: 1,
            ..Config::default()
        };
        Pantry::with_clock(config, FixedClock(date))
    }

    fn access() -> Result<WriteAccess> {
        Ok(OpenGate.authorize(None)?)
    }

    fn listed(name: &str) -> ProductSelection {
        ProductSelection::Listed(name.to_string())
    }

    fn domain_error(err: &anyhow::Error) -> Option<&PantryError> {
        err.downcast_ref::<PantryError>()
    }

    #[test]
    fn distribute_then_reconcile() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 11, 4).ok_or(anyhow!("invalid date"))?;
        let pantry = pantry_in(dir.path(), date)?;
        let access = access()?;

        pantry.distribute(&access, Category::Produce, &listed("Apples"), None, "5")?;
        let saved = pantry.distribute(&access, Category::Produce, &listed("Apples"), None, "3/4")?;
        match saved {
            Recorded::Saved(row) => assert_eq!(row.distributed, Quantity::new(5.75)),
            Recorded::Skipped => return Err(anyhow!("expected a saved row")),
        }

        let row = pantry.record_remaining(&access, Category::Produce, &listed("Apples"), None, "1.75")?;
        assert_eq!(row.remaining, Quantity::new(1.75));
        assert_eq!(row.total_distributed, Quantity::new(4.0));

        let err = pantry
            .record_remaining(&access, Category::Produce, &listed("Apples"), None, "6")
            .err()
            .ok_or(anyhow!("expected rejection"))?;
        assert!(matches!(
            domain_error(&err),
            Some(PantryError::ExceedsDistributed { .. })
        ));

        assert_eq!(
            fs::read_to_string(dir.path().join("product_data.csv"))?,
            "Date,Category,Product,Count Method,Product Distributed,Product Left,Total Product Distributed\n\
             2024-11-04,Produce,Apples,,5.75,1.75,4.0\n"
        );
        Ok(())
    }

    #[test]
    fn zero_distribution_skipped_but_name_kept() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 11, 5).ok_or(anyhow!("invalid date"))?;
        let pantry = pantry_in(dir.path(), date)?;
        let access = access()?;

        let kale = ProductSelection::from_form(CUSTOM_PRODUCT_OPTION, Some("Kale"));
        let recorded = pantry.distribute(&access, Category::Produce, &kale, None, " ")?;
        assert_eq!(recorded, Recorded::Skipped);
        assert!(pantry.ledger()?.is_empty());
        assert!(pantry
            .remaining_options(&Category::Produce)?
            .contains(&"Kale".to_string()));

        let recorded = pantry.distribute(
            &access,
            Category::Produce,
            &kale,
            Some(CountMethod::Crates),
            "2",
        )?;
        assert!(matches!(recorded, Recorded::Saved(_)));
        Ok(())
    }

    #[test]
    fn remaining_options_include_todays_custom_products() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 11, 5).ok_or(anyhow!("invalid date"))?;
        let access = access()?;
        {
            let pantry = pantry_in(dir.path(), date)?;
            let kale = ProductSelection::from_form(CUSTOM_PRODUCT_OPTION, Some("Kale"));
            pantry.distribute(&access, Category::Produce, &kale, None, "3")?;
        }

        let restarted = pantry_in(dir.path(), date)?;
        assert!(restarted.registry().custom_products(&Category::Produce).is_empty());
        let options = restarted.remaining_options(&Category::Produce)?;
        assert_eq!(options.iter().filter(|p| *p == "Kale").count(), 1);
        assert!(!restarted.remaining_options(&Category::Dairy)?.contains(&"Kale".to_string()));

        let next_day = date.succ_opt().ok_or(anyhow!("invalid date"))?;
        let tomorrow = pantry_in(dir.path(), next_day)?;
        assert!(!tomorrow.remaining_options(&Category::Produce)?.contains(&"Kale".to_string()));
        Ok(())
    }

    #[test]
    fn bad_input_writes_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 11, 5).ok_or(anyhow!("invalid date"))?;
        let pantry = pantry_in(dir.path(), date)?;
        let access = access()?;

        let err = pantry
            .distribute(&access, Category::Meat, &listed("Beef"), None, "a lot")
            .err()
            .ok_or(anyhow!("expected rejection"))?;
        assert_eq!(
            domain_error(&err),
            Some(&PantryError::InvalidQuantity("a lot".to_string()))
        );

        let custom = ProductSelection::from_form(CUSTOM_PRODUCT_OPTION, None);
        let err = pantry
            .distribute(&access, Category::Meat, &custom, None, "1")
            .err()
            .ok_or(anyhow!("expected rejection"))?;
        assert_eq!(
            domain_error(&err),
            Some(&PantryError::MissingFields(vec!["Product"]))
        );
        assert!(!dir.path().join("product_data.csv").exists());
        Ok(())
    }

    #[test]
    fn remaining_zero_is_recorded() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 11, 6).ok_or(anyhow!("invalid date"))?;
        let pantry = pantry_in(dir.path(), date)?;
        let access = access()?;

        pantry.distribute(&access, Category::Dairy, &listed("Milk"), None, "4")?;
        let row = pantry.record_remaining(&access, Category::Dairy, &listed("Milk"), None, "")?;
        assert_eq!(row.remaining, Quantity::ZERO);
        assert_eq!(row.total_distributed, Quantity::new(4.0));
        Ok(())
    }

    #[test]
    fn logs_use_clock_date() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 11, 7).ok_or(anyhow!("invalid date"))?;
        let pantry = pantry_in(dir.path(), date)?;
        let access = SharedSecretGate::new("staff").authorize(Some("staff"))?;

        let donation = pantry.log_donation(
            &access,
            DonationForm {
                product_name: "Canned soup".to_string(),
                weight_lbs: "12 1/2".to_string(),
                provider: "Food Bank".to_string(),
                contents: vec!["Canned Goods".to_string()],
                ..DonationForm::default()
            },
        );
        assert!(donation.is_err());

        let donation = pantry.log_donation(
            &access,
            DonationForm {
                product_name: "Canned soup".to_string(),
                weight_lbs: "25/2".to_string(),
                provider: "Food Bank".to_string(),
                contents: vec!["Canned Goods".to_string()],
                ..DonationForm::default()
            },
        )?;
        assert_eq!(donation.date, date);
        assert_eq!(donation.weight_lbs, Quantity::new(12.5));
        assert_eq!(pantry.donations()?, vec![donation]);

        pantry.log_menstrual(&access, "Always", "Pads", 3)?;
        assert_eq!(pantry.menstrual()?.len(), 1);

        let response = pantry.record_survey(SurveyForm {
            gender_identities: vec!["Woman".to_string(), "Non-binary".to_string()],
            ..SurveyForm::default()
        })?;
        assert_eq!(response.gender_identity, "Woman, Non-binary");
        assert_eq!(pantry.surveys()?.len(), 1);
        Ok(())
    }

    #[test]
    fn menu_regeneration() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pantry = pantry_in(dir.path(), Local::now().date_naive())?;
        let access = access()?;

        let menu = pantry.regenerate_menu(&access, &["Milk".to_string(), " ".to_string()])?;
        assert!(!menu.contains(&"Milk".to_string()));
        assert_eq!(pantry.removed_products()?, vec!["Milk"]);
        assert_eq!(pantry.walk_in_menu()?, menu);
        Ok(())
    }

    #[test]
    fn stale_menu_rebuilt_without_removals() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let today = Local::now().date_naive();
        let pantry = pantry_in(dir.path(), today)?;
        let access = access()?;
        pantry.regenerate_menu(&access, &["Milk".to_string()])?;

        let tomorrow = today.succ_opt().ok_or(anyhow!("invalid date"))?;
        let later = pantry_in(dir.path(), tomorrow)?;
        let menu = later.walk_in_menu()?;
        assert!(menu.contains(&"Milk".to_string()));
        assert!(later.removed_products()?.is_empty());
        Ok(())
    }
}
