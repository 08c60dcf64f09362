use crate::error::PantryError;
use crate::quantity::Quantity;
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use log::debug;
use pest::iterators::Pair;
use pest::Parser;

use std::fs;
use std::path::Path;

#[derive(Parser)]
#[grammar = "pantry.pest"]
pub struct PantryParser;

/// Configuration options in the order they were declared, later ones win.
pub type Options = IndexMap<String, String>;

const MAX_INCLUDE_DEPTH: usize = 16;

/// Parse a free-text quantity as typed by staff.
///
/// The text is first read as a rational expression (`3`, `3/4`, `2.5`); if
/// that fails the plain decimal parser gets a go. Only finite values are
/// accepted. Empty input is not special-cased here, see
/// [`Quantity::from_input`].
pub fn parse_quantity(input: &str) -> Result<Quantity, PantryError> {
    let trimmed = input.trim();
    match rational(trimmed) {
        Ok(quantity) => Ok(quantity),
        Err(err) => {
            debug!("'{}' is not a rational quantity ({}), trying decimal", trimmed, err);
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Quantity::new)
                .ok_or_else(|| PantryError::InvalidQuantity(input.to_string()))
        }
    }
}

fn rational(input: &str) -> Result<Quantity> {
    let mut pairs = PantryParser::parse(Rule::quantity, input)?;
    let token = pairs
        .next()
        .and_then(|quantity| quantity.into_inner().next())
        .ok_or(anyhow!("empty quantity"))?;
    let quantity = Quantity::parse(token)?;
    if !quantity.value().is_finite() {
        return Err(anyhow!("'{}' is out of range", input));
    }
    Ok(quantity)
}

pub fn parse_options_file(path: &Path, carried: Option<Options>) -> Result<Options> {
    parse_file_at_depth(path, carried.unwrap_or_default(), 0)
}

/// Parse configuration directives. Relative `include` paths resolve against
/// the current directory; use [`parse_options_file`] to resolve them against
/// the including file instead.
pub fn parse_options(input: &str, carried: Option<Options>) -> Result<Options> {
    parse_at_depth(input, Path::new("."), carried.unwrap_or_default(), 0)
}

fn parse_file_at_depth(path: &Path, carried: Options, depth: usize) -> Result<Options> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(anyhow!(
            "includes nested deeper than {} levels at {}",
            MAX_INCLUDE_DEPTH,
            path.display()
        ));
    }

    let fcontent = fs::read_to_string(path)
        .with_context(|| format!("unable to read config {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_at_depth(&fcontent, base, carried, depth)
}

fn parse_at_depth(input: &str, base: &Path, mut options: Options, depth: usize) -> Result<Options> {
    let directives = PantryParser::parse(Rule::config, input)?
        .next()
        .ok_or(anyhow!("empty configuration"))?
        .into_inner();

    for directive in directives {
        match directive.as_rule() {
            Rule::include => {
                let directive_str = directive.as_str().to_string();
                let target = inner_str(
                    directive
                        .into_inner()
                        .next()
                        .ok_or(anyhow!("unexpected token: {}", directive_str))?,
                )?;
                options = parse_file_at_depth(&base.join(target), options, depth + 1)?;
            }
            Rule::option => {
                let mut option = directive.into_inner();
                let key = inner_str(
                    option
                        .next()
                        .ok_or(anyhow!("invalid next token: {}", option.as_str()))?,
                )?;
                let val = inner_str(
                    option
                        .next()
                        .ok_or(anyhow!("invalid next token: {}", option.as_str()))?,
                )?;
                options.insert(key.to_string(), val.to_string());
            }
            Rule::EOI => {}
            _ => return Err(anyhow!("unexpected token: {}", directive.as_str())),
        };
    }

    Ok(options)
}

pub fn inner_str(token: Pair<'_, Rule>) -> Result<&str> {
    let outer = token.as_str();
    token
        .into_inner()
        .next()
        .map(|inner| inner.as_str())
        .ok_or(anyhow!("expected quoted string, got: {}", outer))
}

#[cfg(test)]
mod tests {
    use crate::error::PantryError;
    use crate::parser::{parse_options, parse_options_file, parse_quantity};

    use anyhow::Result;
    use std::fs;

    #[test]
    fn parse_fraction() -> Result<()> {
        assert_eq!(parse_quantity("3/4")?.value(), 0.75);
        assert_eq!(parse_quantity("-1/2")?.value(), -0.5);
        assert_eq!(parse_quantity(" 1/3 ")?.value(), 1.0 / 3.0);
        Ok(())
    }

    #[test]
    fn parse_whole_and_decimal() -> Result<()> {
        assert_eq!(parse_quantity("2")?.value(), 2.0);
        assert_eq!(parse_quantity("2.5")?.value(), 2.5);
        assert_eq!(parse_quantity(".5")?.value(), 0.5);
        assert_eq!(parse_quantity("3.")?.value(), 3.0);
        assert_eq!(parse_quantity("1e2")?.value(), 100.0);
        Ok(())
    }

    #[test]
    fn reject_garbage() {
        assert_eq!(
            parse_quantity("abc"),
            Err(PantryError::InvalidQuantity("abc".to_string()))
        );
        assert!(parse_quantity("3.5/2").is_err());
        assert!(parse_quantity("3 / x").is_err());
    }

    #[test]
    fn zero_denominator_is_invalid() {
        assert_eq!(
            parse_quantity("3/0"),
            Err(PantryError::InvalidQuantity("3/0".to_string()))
        );
    }

    #[test]
    fn fallback_rejects_non_finite() {
        assert!(parse_quantity("inf").is_err());
        assert!(parse_quantity("NaN").is_err());
    }

    #[test]
    fn rational_overflow_is_invalid() {
        let huge = "9".repeat(400);
        for input in [
            "1e400".to_string(),
            "-1e400".to_string(),
            format!("{}/1", huge),
            format!("{}/{}", huge, huge),
        ] {
            assert_eq!(
                parse_quantity(&input),
                Err(PantryError::InvalidQuantity(input.clone()))
            );
        }
    }

    #[test]
    fn parse_option_directives() -> Result<()> {
        let options = parse_options(
            r#"
# pantry settings
option "data_dir" "/srv/pantry"
option "reconcile" "overwrite" ; trailing comment
option "data_dir" "/var/pantry"
"#,
            None,
        )?;

        assert_eq!(options.get("data_dir").unwrap(), "/var/pantry");
        assert_eq!(options.get("reconcile").unwrap(), "overwrite");
        assert_eq!(options.len(), 2);
        Ok(())
    }

    #[test]
    fn parse_includes_relative_to_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("conf.d"))?;
        fs::write(
            dir.path().join("conf.d/storage.conf"),
            "option \"compact_every\" \"5\"\n",
        )?;
        fs::write(
            dir.path().join("pantry.conf"),
            "option \"compact_every\" \"1\"\ninclude \"conf.d/storage.conf\"",
        )?;

        let options = parse_options_file(&dir.path().join("pantry.conf"), None)?;
        assert_eq!(options.get("compact_every").unwrap(), "5");
        Ok(())
    }

    #[test]
    fn reject_include_cycle() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("loop.conf"), "include \"loop.conf\"\n")?;

        let err = parse_options_file(&dir.path().join("loop.conf"), None).unwrap_err();
        assert!(format!("{}", err).contains("nested deeper"));
        Ok(())
    }

    #[test]
    fn reject_malformed_directive() {
        assert!(parse_options("option \"only-key\"\n", None).is_err());
    }
}
