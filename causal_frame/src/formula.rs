use crate::options::VariableKind;
use crate::CausalError;

/// A parsed `outcome ~ treatment | confounders` formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub outcome: String,
    pub treatment: String,
    pub confounders: Vec<(String, VariableKind)>,
}

impl Formula {
    /// Parses a formula string (e.g., "recovery ~ dose | age + C(ward) + O(stage)").
    ///
    /// `C(..)` or `factor(..)` marks an unordered categorical confounder,
    /// `O(..)` or `ordered(..)` an ordered one; bare names are continuous.
    /// The `| confounders` part is optional.
    pub fn parse(formula_str: &str) -> Result<Formula, CausalError> {
        let parts: Vec<&str> = formula_str.split('~').collect();
        if parts.len() != 2 {
            return Err(CausalError::InvalidParameter(format!(
                "Invalid formula format. Expected 'outcome ~ treatment | confounders', got '{}'",
                formula_str
            )));
        }

        let outcome = parts[0].trim().to_string();
        if outcome.is_empty() {
            return Err(CausalError::InvalidParameter("Outcome variable is missing".to_string()));
        }

        let (treatment_part, confounder_part) = match parts[1].split_once('|') {
            Some((treatment, confounders)) => (treatment, confounders),
            None => (parts[1], ""),
        };

        let treatment = treatment_part.trim().to_string();
        if treatment.is_empty() || treatment.contains('+') {
            return Err(CausalError::InvalidParameter(format!(
                "Expected exactly one treatment variable, got '{}'",
                treatment_part.trim()
            )));
        }

        let mut confounders = Vec::new();
        for term in confounder_part.split('+') {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            confounders.push(parse_term(term));
        }

        Ok(Formula {
            outcome,
            treatment,
            confounders,
        })
    }
}

fn parse_term(term: &str) -> (String, VariableKind) {
    let wrapped = |prefix: &str| -> Option<String> {
        term.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(')'))
            .map(|name| name.trim().to_string())
    };

    if let Some(name) = wrapped("C(").or_else(|| wrapped("factor(")) {
        (name, VariableKind::Unordered)
    } else if let Some(name) = wrapped("O(").or_else(|| wrapped("ordered(")) {
        (name, VariableKind::Ordered)
    } else {
        (term.to_string(), VariableKind::Continuous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let f = Formula::parse("recovery ~ dose | age + weight").unwrap();
        assert_eq!(f.outcome, "recovery");
        assert_eq!(f.treatment, "dose");
        assert_eq!(
            f.confounders,
            vec![
                ("age".to_string(), VariableKind::Continuous),
                ("weight".to_string(), VariableKind::Continuous)
            ]
        );
    }

    #[test]
    fn test_parse_categorical() {
        let f = Formula::parse("recovery ~ dose | age + C(ward) + factor(sex) + O(stage)").unwrap();
        assert_eq!(
            f.confounders,
            vec![
                ("age".to_string(), VariableKind::Continuous),
                ("ward".to_string(), VariableKind::Unordered),
                ("sex".to_string(), VariableKind::Unordered),
                ("stage".to_string(), VariableKind::Ordered)
            ]
        );
    }

    #[test]
    fn test_parse_without_confounders() {
        let f = Formula::parse("  recovery   ~   dose  ").unwrap();
        assert_eq!(f.treatment, "dose");
        assert!(f.confounders.is_empty());
    }

    #[test]
    fn test_parse_rejects_two_treatments() {
        assert!(Formula::parse("recovery ~ dose + age").is_err());
        assert!(Formula::parse("recovery dose").is_err());
        assert!(Formula::parse(" ~ dose").is_err());
    }
}
