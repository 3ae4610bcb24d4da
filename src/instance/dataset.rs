//! Plain-text dataset files.
//!
//! Whitespace-separated tokens, line breaks carry no meaning:
//!
//! ```text
//! m n
//! capacity_0 fixed_cost_0
//! ...
//! capacity_{m-1} fixed_cost_{m-1}
//! demand_0 ... demand_{n-1}
//! cost(facility 0, customer 0) ... cost(facility 0, customer n-1)
//! ...
//! ```
//!
//! The cost block is facility-major and is transposed on load.

use std::fs;
use std::path::Path;
use std::str::SplitWhitespace;

use log::debug;
use ndarray::Array2;

use super::Instance;
use crate::error::{Error, Result};

pub fn read_dataset(path: impl AsRef<Path>) -> Result<Instance> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let instance = parse_dataset(&text)?;
    debug!(
        "loaded {}: {} facilities, {} customers",
        path.display(),
        instance.num_facilities(),
        instance.num_customers()
    );
    Ok(instance)
}

pub fn parse_dataset(text: &str) -> Result<Instance> {
    let mut tokens = Tokens::new(text);

    let m = tokens.count("number of facilities")?;
    let n = tokens.count("number of customers")?;

    let mut capacities = Vec::with_capacity(m);
    let mut fixed_costs = Vec::with_capacity(m);
    for j in 0..m {
        capacities.push(tokens.value(|| format!("capacity of facility {j}"))?);
        fixed_costs.push(tokens.value(|| format!("fixed cost of facility {j}"))?);
    }

    let mut demands = Vec::with_capacity(n);
    for i in 0..n {
        demands.push(tokens.value(|| format!("demand of customer {i}"))?);
    }

    let mut shipment_costs = Array2::zeros((n, m));
    for j in 0..m {
        for i in 0..n {
            shipment_costs[[i, j]] =
                tokens.value(|| format!("cost from facility {j} to customer {i}"))?;
        }
    }

    tokens.finish()?;
    Instance::new(demands, capacities, fixed_costs, shipment_costs)
}

pub fn format_dataset(instance: &Instance) -> String {
    let mut lines = vec![format!(
        "{} {}",
        instance.num_facilities(),
        instance.num_customers()
    )];
    lines.extend(
        instance
            .capacities()
            .iter()
            .zip(instance.fixed_costs())
            .map(|(cap, fixed)| format!("{cap} {fixed}")),
    );
    lines.push(join(instance.demands().iter()));
    lines.extend(
        instance
            .shipment_costs()
            .columns()
            .into_iter()
            .map(|column| join(column.iter())),
    );
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn write_dataset(instance: &Instance, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, format_dataset(instance))?;
    Ok(())
}

fn join<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
    position: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
            position: 0,
        }
    }

    fn next(&mut self, what: &dyn Fn() -> String) -> Result<&'a str> {
        let token = self.inner.next().ok_or_else(|| Error::MalformedDataset {
            token: self.position,
            reason: format!("unexpected end of input, expected {}", what()),
        })?;
        self.position += 1;
        Ok(token)
    }

    fn count(&mut self, what: &'static str) -> Result<usize> {
        let position = self.position;
        let token = self.next(&|| what.to_string())?;
        token.parse().map_err(|_| Error::MalformedDataset {
            token: position,
            reason: format!("expected {what}, found {token:?}"),
        })
    }

    fn value(&mut self, what: impl Fn() -> String) -> Result<f64> {
        let position = self.position;
        let token = self.next(&what)?;
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(Error::MalformedDataset {
                token: position,
                reason: format!("expected {}, found {token:?}", what()),
            }),
        }
    }

    fn finish(mut self) -> Result<()> {
        match self.inner.next() {
            Some(token) => Err(Error::MalformedDataset {
                token: self.position,
                reason: format!("unexpected trailing token {token:?}"),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::generate_random_instance;

    const SMALL: &str = "2 3\n\
                         10 5\n\
                         12 7.5\n\
                         4 4 4\n\
                         1 3 5\n\
                         2 4 6\n";

    #[test]
    fn test_parse_transposes_costs() {
        let instance = parse_dataset(SMALL).unwrap();
        assert_eq!(instance.num_facilities(), 2);
        assert_eq!(instance.num_customers(), 3);
        assert_eq!(instance.capacities(), &[10.0, 12.0]);
        assert_eq!(instance.fixed_costs(), &[5.0, 7.5]);
        assert_eq!(instance.demands(), &[4.0, 4.0, 4.0]);
        assert_eq!(instance.shipment_cost(0, 1), 2.0);
        assert_eq!(instance.shipment_cost(2, 0), 5.0);
    }

    #[test]
    fn test_format_then_parse() {
        let instance = generate_random_instance(7, 3).unwrap();
        let parsed = parse_dataset(&format_dataset(&instance)).unwrap();
        assert_eq!(parsed, instance);
    }

    #[test]
    fn test_format_layout() {
        let instance = parse_dataset(SMALL).unwrap();
        assert_eq!(format_dataset(&instance), "2 3\n10 5\n12 7.5\n4 4 4\n1 3 5\n2 4 6\n");
    }

    #[test]
    fn test_truncated_input() {
        let err = parse_dataset("2 3\n10 5\n12").unwrap_err();
        match err {
            Error::MalformedDataset { token, reason } => {
                assert_eq!(token, 5);
                assert!(reason.contains("fixed cost of facility 1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bad_token() {
        let err = parse_dataset("2 x").unwrap_err();
        assert!(matches!(err, Error::MalformedDataset { token: 1, .. }));

        let err = parse_dataset("1 1\n10 abc\n1\n1").unwrap_err();
        match err {
            Error::MalformedDataset { token, reason } => {
                assert_eq!(token, 3);
                assert!(reason.contains("fixed cost of facility 0"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_dataset(&format!("{} 9", SMALL)).unwrap_err();
        assert!(matches!(err, Error::MalformedDataset { token: 15, .. }));
    }

    #[test]
    fn test_file_round_trip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let instance = parse_dataset(SMALL)?;
        let path = std::env::temp_dir().join(format!("cflp-dataset-{}.txt", std::process::id()));
        write_dataset(&instance, &path)?;
        let loaded = read_dataset(&path)?;
        fs::remove_file(&path)?;
        assert_eq!(loaded, instance);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = read_dataset("/nonexistent/cflp/dataset.txt").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
