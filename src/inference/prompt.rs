//! Console prompts for one feature vector

use crate::error::{FireError, Result};
use std::io::{BufRead, Write};

/// Ask for each feature in turn and parse the answers as numbers.
///
/// A non-numeric answer fails with [`FireError::ParseError`] naming the
/// feature; end of input fails with [`FireError::InvalidInput`].
pub fn prompt_feature_values<R, W>(reader: &mut R, writer: &mut W, features: &[String]) -> Result<Vec<f64>>
where
    R: BufRead,
    W: Write,
{
    let mut values = Vec::with_capacity(features.len());
    let mut line = String::new();

    for feature in features {
        write!(writer, "Enter value for {}: ", feature)?;
        writer.flush()?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(FireError::InvalidInput(format!(
                "input ended before a value for {} was given",
                feature
            )));
        }

        let input = line.trim();
        let value: f64 = input.parse().map_err(|_| FireError::ParseError {
            feature: feature.clone(),
            input: input.to_string(),
        })?;
        values.push(value);
    }

    Ok(values)
}

/// Parse a comma-separated list of numbers
pub fn parse_value_list(text: &str, features: &[String]) -> Result<Vec<f64>> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != features.len() {
        return Err(FireError::ShapeError {
            expected: format!("{} values ({})", features.len(), features.join(", ")),
            actual: format!("{} values", parts.len()),
        });
    }

    parts
        .iter()
        .zip(features)
        .map(|(part, feature)| {
            part.parse().map_err(|_| FireError::ParseError {
                feature: feature.clone(),
                input: part.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn names() -> Vec<String> {
        vec!["Temperature".to_string(), "RH".to_string()]
    }

    #[test]
    fn test_reads_one_value_per_feature() {
        let mut input = Cursor::new("29.5\n 57 \n");
        let mut output = Vec::new();
        let values = prompt_feature_values(&mut input, &mut output, &names()).unwrap();

        assert_eq!(values, vec![29.5, 57.0]);
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Enter value for Temperature: "));
        assert!(shown.contains("Enter value for RH: "));
    }

    #[test]
    fn test_non_numeric_names_the_feature() {
        let mut input = Cursor::new("30\nhumid\n");
        let err = prompt_feature_values(&mut input, &mut Vec::new(), &names()).unwrap_err();
        match err {
            FireError::ParseError { feature, input } => {
                assert_eq!(feature, "RH");
                assert_eq!(input, "humid");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_early_eof() {
        let mut input = Cursor::new("30\n");
        assert!(matches!(
            prompt_feature_values(&mut input, &mut Vec::new(), &names()),
            Err(FireError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_value_list() {
        assert_eq!(parse_value_list("1, 2.5", &names()).unwrap(), vec![1.0, 2.5]);
        assert!(parse_value_list("1", &names()).is_err());
        assert!(matches!(
            parse_value_list("1,x", &names()),
            Err(FireError::ParseError { .. })
        ));
    }
}
