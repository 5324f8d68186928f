//! Kurucz gfall line-list ingestion: fixed-width decoding, lower/upper
//! normalization, level and line extraction, ionization culling and hand-over
//! to a level/line store.

pub mod common;
pub mod domain;
pub mod formats;
pub mod gfall;
pub mod ionization;
pub mod persistence;
pub mod selection;
pub mod serialization;

pub use domain::{GfallError, GfallErrorCategory, GfallResult, IdentityKey, IonKey};
pub use gfall::{GfallReader, GfallTables, ReaderConfig};
pub use ionization::{AtomicDataset, DatasetConfig, IonizationEnergySource, build_dataset};
pub use persistence::{GfallIngester, InMemoryStore, LevelLineStore};
pub use selection::IonSelection;
