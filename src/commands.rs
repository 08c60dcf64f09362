use crate::output;
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use libpantry::access::WriteAccess;
use libpantry::catalog::{Category, CountMethod, ProductSelection, CUSTOM_PRODUCT_OPTION};
use libpantry::logs::{DonationForm, SpoilageForm, SurveyForm};
use libpantry::service::{Clock, Pantry};
use libpantry::Recorded;

#[derive(Subcommand)]
pub enum Commands {
    /// Log product handed out today
    Distribute(LedgerArgs),

    /// Record how much of a product is left at the end of today
    Remaining(LedgerArgs),

    /// Show the distribution ledger
    Ledger {
        /// Only rows for this date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List the products offered for a category
    Products {
        /// Category label, e.g. "Produce" or "Canned/Jarred Foods"
        category: String,
        /// List the end-of-day choices instead: predefined products plus
        /// anything logged today under this category
        #[arg(long)]
        remaining: bool,
    },

    /// Log a donation
    Donation {
        #[arg(long)]
        product: String,
        /// Weight in pounds, fractions allowed
        #[arg(long)]
        weight: String,
        #[arg(long)]
        provider: String,
        /// Required when the provider is "Other"
        #[arg(long, default_value = "")]
        donor_details: String,
        #[arg(long, value_delimiter = ',', required = true)]
        contents: Vec<String>,
        /// Required when contents include "Other"
        #[arg(long, default_value = "")]
        other_contents: String,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Log spoiled or discarded food
    Spoilage(SpoilageArgs),

    /// Log menstrual products handed out
    Menstrual {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        product_type: String,
        #[arg(long, default_value = "1")]
        quantity: u32,
    },

    /// Submit an anonymous survey response
    Survey(SurveyArgs),

    /// Show today's walk-in menu, or rebuild it
    Menu {
        /// Rebuild the menu, leaving out every --remove product
        #[arg(long)]
        regenerate: bool,
        /// Product pulled for the day
        #[arg(long)]
        remove: Vec<String>,
    },

    /// Fold the ledger journal into the table
    Compact,
}

#[derive(Args)]
pub struct LedgerArgs {
    /// Category label, e.g. "Produce" or "Canned/Jarred Foods"
    #[arg(long)]
    category: String,
    /// Product from the category's list
    #[arg(long, required_unless_present = "custom")]
    product: Option<String>,
    /// Custom product name, for products not on the list
    #[arg(long, conflicts_with = "product")]
    custom: Option<String>,
    /// Individual or Crates
    #[arg(long)]
    count_method: Option<CountMethod>,
    /// Quantity, fractions allowed (e.g. 2.5 or 3/4)
    #[arg(allow_hyphen_values = true, default_value = "")]
    quantity: String,
}

impl LedgerArgs {
    fn selection(&self) -> ProductSelection {
        match &self.custom {
            Some(name) => ProductSelection::from_form(CUSTOM_PRODUCT_OPTION, Some(name)),
            None => ProductSelection::from_form(self.product.as_deref().unwrap_or_default(), None),
        }
    }
}

#[derive(Args)]
pub struct SpoilageArgs {
    /// Total item weight in pounds, fractions allowed
    #[arg(long)]
    weight: String,
    #[arg(long, value_delimiter = ',', required = true)]
    source: Vec<String>,
    #[arg(long, default_value = "")]
    source_details: String,
    #[arg(long, value_delimiter = ',', required = true)]
    contents: Vec<String>,
    #[arg(long, default_value = "")]
    contents_details: String,
    #[arg(long, default_value = "")]
    contents_notes: String,
    #[arg(long, value_delimiter = ',', required = true)]
    destination: Vec<String>,
    #[arg(long, default_value = "")]
    destination_details: String,
    #[arg(long, value_delimiter = ',', required = true)]
    reason: Vec<String>,
    #[arg(long, default_value = "")]
    reasons_details: String,
    #[arg(long, default_value = "")]
    notes: String,
}

impl From<SpoilageArgs> for SpoilageForm {
    fn from(args: SpoilageArgs) -> Self {
        SpoilageForm {
            weight_lbs: args.weight,
            sources: args.source,
            source_details: args.source_details,
            contents: args.contents,
            contents_details: args.contents_details,
            contents_notes: args.contents_notes,
            destinations: args.destination,
            destination_details: args.destination_details,
            reasons: args.reason,
            reasons_details: args.reasons_details,
            notes: args.notes,
        }
    }
}

/// Every question may be skipped.
#[derive(Args)]
pub struct SurveyArgs {
    #[arg(long, default_value = "")]
    age: String,
    #[arg(long, value_delimiter = ',')]
    gender: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    race: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    financial: Vec<String>,
    #[arg(long, default_value = "")]
    income: String,
    #[arg(long, value_delimiter = ',')]
    plan_b_barrier: Vec<String>,
}

impl From<SurveyArgs> for SurveyForm {
    fn from(args: SurveyArgs) -> Self {
        SurveyForm {
            age: args.age,
            gender_identities: args.gender,
            racial_backgrounds: args.race,
            financial_backgrounds: args.financial,
            annual_income: args.income,
            plan_b_barriers: args.plan_b_barrier,
        }
    }
}

pub fn run<C: Clock>(pantry: &Pantry<C>, token: Option<&str>, command: Commands) -> Result<()> {
    let gate = pantry.config().access_gate();
    let authorize = || -> Result<WriteAccess> { Ok(gate.authorize(token)?) };

    match command {
        Commands::Distribute(args) => {
            let access = authorize()?;
            let category = Category::from(args.category.as_str());
            match pantry.distribute(
                &access,
                category,
                &args.selection(),
                args.count_method,
                &args.quantity,
            )? {
                Recorded::Saved(row) => output::print_rows(&[row]),
                Recorded::Skipped => println!("Nothing distributed, no row written."),
            }
            Ok(())
        }

        Commands::Remaining(args) => {
            let access = authorize()?;
            let category = Category::from(args.category.as_str());
            let row = pantry.record_remaining(
                &access,
                category,
                &args.selection(),
                args.count_method,
                &args.quantity,
            )?;
            output::print_rows(&[row]);
            Ok(())
        }

        Commands::Ledger { date } => {
            let rows = match date {
                Some(date) => pantry.ledger_on(&date)?,
                None => pantry.ledger()?,
            };
            output::print_rows(&rows);
            Ok(())
        }

        Commands::Products {
            category,
            remaining,
        } => {
            let category = Category::from(category.as_str());
            let options = if remaining {
                pantry.remaining_options(&category)?
            } else {
                pantry.distribution_options(&category)
            };
            output::print_list(&options);
            Ok(())
        }

        Commands::Donation {
            product,
            weight,
            provider,
            donor_details,
            contents,
            other_contents,
            notes,
        } => {
            let access = authorize()?;
            let entry = pantry.log_donation(
                &access,
                DonationForm {
                    product_name: product,
                    weight_lbs: weight,
                    provider,
                    donor_details,
                    contents,
                    other_contents_details: other_contents,
                    notes,
                },
            )?;
            println!(
                "Logged donation of {} lbs of '{}' on {}.",
                entry.weight_lbs, entry.product_name, entry.date
            );
            Ok(())
        }

        Commands::Spoilage(args) => {
            let access = authorize()?;
            let entry = pantry.log_spoilage(&access, args.into())?;
            println!(
                "Logged {} lbs of spoilage on {}.",
                entry.weight_lbs, entry.date
            );
            Ok(())
        }

        Commands::Menstrual {
            brand,
            product_type,
            quantity,
        } => {
            let access = authorize()?;
            let entry = pantry.log_menstrual(&access, &brand, &product_type, quantity)?;
            println!(
                "Logged {} x {} {} on {}.",
                entry.quantity, entry.brand, entry.product_type, entry.date
            );
            Ok(())
        }

        Commands::Survey(args) => {
            pantry.record_survey(args.into())?;
            println!("Thank you for your response.");
            Ok(())
        }

        Commands::Menu { regenerate, remove } => {
            let menu = if regenerate {
                let access = authorize()?;
                pantry.regenerate_menu(&access, &remove)?
            } else {
                pantry.walk_in_menu()?
            };
            output::print_list(&menu);
            Ok(())
        }

        Commands::Compact => {
            let access = authorize()?;
            pantry.compact(&access)?;
            println!("Ledger compacted.");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::{run, Commands, LedgerArgs};
    use libpantry::catalog::{Category, CountMethod, ProductSelection};
    use libpantry::config::Config;
    use libpantry::service::{FixedClock, Pantry};
    use libpantry::Quantity;
    use chrono::NaiveDate;

    use anyhow::{anyhow, Result};

    fn ledger_args(product: Option<&str>, custom: Option<&str>, quantity: &str) -> LedgerArgs {
        LedgerArgs {
            category: "produce".to_string(),
            product: product.map(str::to_string),
            custom: custom.map(str::to_string),
            count_method: Some(CountMethod::Crates),
            quantity: quantity.to_string(),
        }
    }

    #[test]
    fn custom_name_wins() {
        assert_eq!(
            ledger_args(None, Some("Kale"), "1").selection(),
            ProductSelection::Custom("Kale".to_string())
        );
        assert_eq!(
            ledger_args(Some("Apples"), None, "1").selection(),
            ProductSelection::Listed("Apples".to_string())
        );
    }

    #[test]
    fn commands_write_through_pantry() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let date = NaiveDate::from_ymd_opt(2024, 11, 8).ok_or(anyhow!("invalid date"))?;
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            write_secret_env: "PANTRY_CLI_TEST_SECRET_NEVER_SET".to_string(),
            ..Config::default()
        };
        let pantry = Pantry::with_clock(config, FixedClock(date))?;

        run(
            &pantry,
            None,
            Commands::Distribute(ledger_args(Some("Apples"), None, "3/2")),
        )?;
        run(
            &pantry,
            None,
            Commands::Remaining(ledger_args(Some("Apples"), None, "1/2")),
        )?;

        run(
            &pantry,
            None,
            Commands::Distribute(ledger_args(None, Some("Kale"), "2")),
        )?;
        run(
            &pantry,
            None,
            Commands::Products {
                category: "Produce".to_string(),
                remaining: true,
            },
        )?;
        assert!(pantry
            .remaining_options(&Category::Produce)?
            .contains(&"Kale".to_string()));

        let rows = pantry.ledger_on(&date)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_distributed, Quantity::new(1.0));
        assert_eq!(rows[0].count_method, Some(CountMethod::Crates));
        Ok(())
    }
}
