use crate::domain::{GfallError, IonKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Optional restriction of the pipeline to a set of ions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IonSelection {
    ions: Option<BTreeSet<IonKey>>,
}

impl IonSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(ions: impl IntoIterator<Item = IonKey>) -> Self {
        Self {
            ions: Some(ions.into_iter().collect()),
        }
    }

    pub fn is_all(&self) -> bool {
        self.ions.is_none()
    }

    pub fn contains(&self, ion: IonKey) -> bool {
        self.ions.as_ref().is_none_or(|ions| ions.contains(&ion))
    }

    pub fn ions(&self) -> Option<&BTreeSet<IonKey>> {
        self.ions.as_ref()
    }
}

impl FromStr for IonSelection {
    type Err = GfallError;

    /// Parses `26:1,8:0`; an empty string selects every ion.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let entries = value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse::<IonKey>)
            .collect::<Result<BTreeSet<_>, _>>()?;

        if entries.is_empty() {
            Ok(Self::all())
        } else {
            Ok(Self::only(entries))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IonSelection;
    use crate::domain::IonKey;

    #[test]
    fn default_selection_accepts_every_ion() {
        let selection = IonSelection::all();
        assert!(selection.is_all());
        assert!(selection.contains(IonKey::new(26, 1)));
        assert_eq!("".parse::<IonSelection>().unwrap(), selection);
    }

    #[test]
    fn listed_ions_restrict_the_selection() {
        let selection = " 26:1, 8:0 ".parse::<IonSelection>().unwrap();
        assert!(!selection.is_all());
        assert!(selection.contains(IonKey::new(26, 1)));
        assert!(selection.contains(IonKey::new(8, 0)));
        assert!(!selection.contains(IonKey::new(26, 0)));
        assert_eq!(selection.ions().map(|ions| ions.len()), Some(2));
    }

    #[test]
    fn malformed_entries_are_rejected() {
        let error = "26:1,iron".parse::<IonSelection>().unwrap_err();
        assert_eq!(error.placeholder(), "CONFIG.ION");
        assert!("8:8".parse::<IonSelection>().is_err());
    }
}
