use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Defines a `0.0.<num>` ledger entity identifier newtype.
///
/// All simulated ledger entities (accounts, tokens, files, topics) share the
/// three-part rendering of the source network; the distinct Rust types keep
/// them from being mixed up at API boundaries.
macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(u64);

        impl $name {
            /// Build an identifier from its entity number.
            pub const fn new(num: u64) -> Self {
                Self(num)
            }

            /// The entity number (the final component of `0.0.<num>`).
            pub const fn num(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0.0.{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(0.0.{})"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let num = s
                    .strip_prefix("0.0.")
                    .and_then(|n| n.parse::<u64>().ok())
                    .ok_or_else(|| TypeError::InvalidEntityId(s.to_string()))?;
                Ok(Self(num))
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_string()
            }
        }
    };
}

entity_id! {
    /// A ledger account (exporter, investor, attester, or system account).
    AccountId
}

entity_id! {
    /// A simulated token: either an invoice identity token or a
    /// fractional-claim token.
    TokenId
}

entity_id! {
    /// A simulated document-storage entry.
    FileId
}

entity_id! {
    /// An event-log channel.
    TopicId
}

impl TopicId {
    /// The single global event channel all invoice events publish to.
    pub const GLOBAL: TopicId = TopicId::new(70_001);
}

const INVOICE_SUFFIX_LEN: usize = 4;
const INVOICE_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Unique listing identifier, rendered `INV-XXXX`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceId(String);

impl InvoiceId {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..INVOICE_SUFFIX_LEN)
            .map(|_| INVOICE_CHARSET[rng.gen_range(0..INVOICE_CHARSET.len())] as char)
            .collect();
        Self(format!("INV-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InvoiceId({})", self.0)
    }
}

impl FromStr for InvoiceId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let suffix = s
            .strip_prefix("INV-")
            .ok_or_else(|| TypeError::InvalidInvoiceId(s.to_string()))?;
        let valid = suffix.len() == INVOICE_SUFFIX_LEN
            && suffix.bytes().all(|b| INVOICE_CHARSET.contains(&b));
        if !valid {
            return Err(TypeError::InvalidInvoiceId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for InvoiceId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InvoiceId> for String {
    fn from(id: InvoiceId) -> String {
        id.0
    }
}
