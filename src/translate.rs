//! Domain objects standing in for rungs.
//!
//! A [`RungTranslator`] maps values of one domain type onto rungs, and a
//! [`TranslatedLineage`] lets callers address a lineage in those terms: "the
//! key for 2024-01-09" rather than "the key for rung 738894".
//!
//! Translators must be deterministic and injective over their declared
//! domain. A custom translator that aliases two values onto one rung gives
//! them one key; nothing here detects that.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::envelope::TaggedCiphertext;
use crate::error::LineageError;
use crate::lineage::Lineage;
use crate::Rung;

const SECONDS_PER_HOUR: i64 = 3600;

/// Maps one domain type onto rungs.
pub trait RungTranslator {
    type Domain: ?Sized;

    /// The rung for `value`, or [`LineageError::Translation`] if `value` is
    /// outside this translator's domain.
    fn translate(&self, value: &Self::Domain) -> Result<Rung, LineageError>;
}

/// Calendar dates as proleptic Gregorian day ordinals: 0001-01-01 is rung 1,
/// each following day one rung higher.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayOrdinal;

impl RungTranslator for DayOrdinal {
    type Domain = NaiveDate;

    fn translate(&self, date: &NaiveDate) -> Result<Rung, LineageError> {
        let ordinal = date.num_days_from_ce();
        if ordinal < 1 {
            return Err(LineageError::Translation(format!(
                "{} precedes 0001-01-01",
                date
            )));
        }
        Ok(ordinal as Rung)
    }
}

/// Hour-aligned instants as hours since the Unix epoch.
///
/// Only instants exactly on an hour boundary are in the domain, so no two
/// accepted instants share a rung. Truncate before translating if a
/// coarser key is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixHours;

impl RungTranslator for UnixHours {
    type Domain = DateTime<Utc>;

    fn translate(&self, instant: &DateTime<Utc>) -> Result<Rung, LineageError> {
        let seconds = instant.timestamp();
        if seconds < 0 {
            return Err(LineageError::Translation(format!(
                "{} precedes the Unix epoch",
                instant
            )));
        }
        if seconds % SECONDS_PER_HOUR != 0 || instant.timestamp_subsec_nanos() != 0 {
            return Err(LineageError::Translation(format!(
                "{} is not on an hour boundary",
                instant
            )));
        }
        Ok((seconds / SECONDS_PER_HOUR) as Rung)
    }
}

/// A lineage addressed through a translator.
///
/// Wherever a rung is optional, `None` means the wrapped node's own max rung.
pub struct TranslatedLineage<T: RungTranslator> {
    lineage: Arc<Lineage>,
    translator: T,
}

impl<T: RungTranslator + Clone> TranslatedLineage<T> {
    pub fn new(lineage: Arc<Lineage>, translator: T) -> Self {
        Self {
            lineage,
            translator,
        }
    }

    /// Build a root lineage whose max rung is the translation of `top`.
    pub fn root(seed: &[u8], top: &T::Domain, translator: T) -> Result<Self, LineageError> {
        let max_rung = translator.translate(top)?;
        Ok(Self::new(Arc::new(Lineage::new(seed, max_rung)), translator))
    }

    /// The rung `value` translates to.
    pub fn rung_of(&self, value: &T::Domain) -> Result<Rung, LineageError> {
        self.translator.translate(value)
    }

    /// The wrapped lineage, for rung-level access.
    pub fn lineage(&self) -> &Arc<Lineage> {
        &self.lineage
    }

    pub fn max_rung(&self) -> Rung {
        self.lineage.max_rung()
    }

    fn resolve(&self, at: Option<&T::Domain>) -> Result<Rung, LineageError> {
        match at {
            Some(value) => self.translator.translate(value),
            None => Ok(self.lineage.max_rung()),
        }
    }

    /// The descendant for `at`, still addressed through this translator.
    pub fn sublineage(&self, at: Option<&T::Domain>) -> Result<Self, LineageError> {
        let rung = self.resolve(at)?;
        Ok(Self::new(
            self.lineage.sublineage(rung)?,
            self.translator.clone(),
        ))
    }

    /// Encrypt `data` under the key for `at`.
    pub fn encrypt(
        &self,
        data: &[u8],
        at: Option<&T::Domain>,
    ) -> Result<TaggedCiphertext, LineageError> {
        let rung = self.resolve(at)?;
        self.lineage.encrypt_at(data, rung)
    }

    /// Decrypt a tagged ciphertext. The tag already carries a rung, so no
    /// translation happens here.
    pub fn decrypt(&self, tagged: &TaggedCiphertext) -> Result<Vec<u8>, LineageError> {
        self.lineage.decrypt(tagged)
    }
}
