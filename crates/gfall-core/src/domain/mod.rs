pub mod errors;

pub use errors::{GfallError, GfallErrorCategory, GfallResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Ion identity: atomic number plus net charge (0 = neutral).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct IonKey {
    pub atomic_number: u32,
    pub ion_charge: u32,
}

impl IonKey {
    pub const fn new(atomic_number: u32, ion_charge: u32) -> Self {
        Self {
            atomic_number,
            ion_charge,
        }
    }
}

impl Display for IonKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.atomic_number, self.ion_charge)
    }
}

impl FromStr for IonKey {
    type Err = GfallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            GfallError::format(
                "CONFIG.ION",
                format!("invalid ion '{value}'; expected '<atomic_number>:<ion_charge>'"),
            )
        };

        let (atomic_number, ion_charge) = value.trim().split_once(':').ok_or_else(invalid)?;
        let atomic_number = atomic_number.trim().parse::<u32>().map_err(|_| invalid())?;
        let ion_charge = ion_charge.trim().parse::<u32>().map_err(|_| invalid())?;
        if atomic_number == 0 || ion_charge >= atomic_number {
            return Err(invalid());
        }
        Ok(Self::new(atomic_number, ion_charge))
    }
}

/// Tagged pair of the energetically lower and upper member of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPair<T> {
    pub lower: T,
    pub upper: T,
}

impl<T> LevelPair<T> {
    pub fn new(lower: T, upper: T) -> Self {
        Self { lower, upper }
    }

    pub fn as_ref(&self) -> LevelPair<&T> {
        LevelPair {
            lower: &self.lower,
            upper: &self.upper,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> LevelPair<U> {
        LevelPair {
            lower: f(self.lower),
            upper: f(self.upper),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelMethod {
    #[serde(rename = "theor")]
    Theoretical,
    #[serde(rename = "meas")]
    Measured,
}

impl LevelMethod {
    pub const fn from_theoretical(theoretical: bool) -> Self {
        if theoretical {
            Self::Theoretical
        } else {
            Self::Measured
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Theoretical => "theor",
            Self::Measured => "meas",
        }
    }
}

impl Display for LevelMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Vacuum,
    Air,
}

/// Level attributes that may take part in the uniqueness key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelAttribute {
    Energy,
    J,
    Label,
}

impl LevelAttribute {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::J => "j",
            Self::Label => "label",
        }
    }
}

impl FromStr for LevelAttribute {
    type Err = GfallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "energy" => Ok(Self::Energy),
            "j" => Ok(Self::J),
            "label" => Ok(Self::Label),
            other => Err(GfallError::format(
                "CONFIG.IDENTITY_KEY",
                format!("unknown level attribute '{other}'; expected energy, j or label"),
            )),
        }
    }
}

impl Display for LevelAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Read access to the attributes an [`IdentityKey`] can select.
pub trait LevelAttributes {
    fn energy(&self) -> f64;
    fn j(&self) -> f64;
    fn label(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyComponent {
    Float(u64),
    Text(String),
}

/// Composite "ion + identity attributes" key used for deduplication and joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelKey {
    pub ion: IonKey,
    pub components: Vec<KeyComponent>,
}

/// Attributes which, together with the ion, make a level unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    attributes: Vec<LevelAttribute>,
}

impl IdentityKey {
    pub fn new(attributes: Vec<LevelAttribute>) -> GfallResult<Self> {
        if attributes.is_empty() {
            return Err(GfallError::format(
                "CONFIG.IDENTITY_KEY",
                "identity key needs at least one level attribute",
            ));
        }
        let mut deduplicated = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            if !deduplicated.contains(&attribute) {
                deduplicated.push(attribute);
            }
        }
        Ok(Self {
            attributes: deduplicated,
        })
    }

    pub fn parse_list(value: &str) -> GfallResult<Self> {
        let attributes = value
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .map(str::parse)
            .collect::<GfallResult<Vec<LevelAttribute>>>()?;
        Self::new(attributes)
    }

    pub fn attributes(&self) -> &[LevelAttribute] {
        &self.attributes
    }

    pub fn key_for(&self, ion: IonKey, level: &impl LevelAttributes) -> LevelKey {
        let components = self
            .attributes
            .iter()
            .map(|attribute| match attribute {
                LevelAttribute::Energy => KeyComponent::Float(float_key(level.energy())),
                LevelAttribute::J => KeyComponent::Float(float_key(level.j())),
                LevelAttribute::Label => KeyComponent::Text(level.label().to_string()),
            })
            .collect();
        LevelKey { ion, components }
    }
}

impl Default for IdentityKey {
    fn default() -> Self {
        Self {
            attributes: vec![LevelAttribute::Energy, LevelAttribute::J],
        }
    }
}

impl Display for IdentityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = self
            .attributes
            .iter()
            .map(|attribute| attribute.as_str())
            .collect::<Vec<_>>();
        f.write_str(&names.join(","))
    }
}

// Signed zero collapses to +0.0 so that |-0.0| and 0.0 hash alike.
fn float_key(value: f64) -> u64 {
    if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
}
