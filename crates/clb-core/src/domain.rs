use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). Channels use negative ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Money amount in the smallest currency unit (cents).
///
/// Serialized as a decimal number of whole units (`7.5` for 7,50 EUR) so the
/// data file stays hand-editable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn from_units(units: u64) -> Self {
        Self(units * 100)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse a user-entered amount: `7`, `7.5`, `7,50`, `€7.50`, `7 EUR`.
    ///
    /// At most two fraction digits are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw
            .trim()
            .trim_start_matches('€')
            .trim_end_matches('€')
            .trim_end_matches("EUR")
            .trim_end_matches("eur")
            .trim()
            .replace(',', ".");
        if s.is_empty() {
            return None;
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s.as_str(), ""),
        };
        if frac.len() > 2 || (whole.is_empty() && frac.is_empty()) {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac_cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .map(Self)
    }

    fn from_f64_units(v: f64) -> Option<Self> {
        if !v.is_finite() || v < 0.0 {
            return None;
        }
        Some(Self((v * 100.0).round() as u64))
    }

    fn as_f64_units(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            s.serialize_u64(self.0 / 100)
        } else {
            s.serialize_f64(self.as_f64_units())
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let v = f64::deserialize(d)?;
        Self::from_f64_units(v)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {v}")))
    }
}
