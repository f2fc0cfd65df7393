use std::{
    fmt,
    fmt::{Debug, Display},
};

use zeroize::Zeroize;

/// A value that must never show up in logs. `Debug` and `Display` print `****`, and the contents are wiped when the
/// value is dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T>
where T: Clone + Default + Zeroize
{
    value: T,
}

impl<T: Clone + Default + Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default + Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

impl<T: Clone + Default + Zeroize> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default + Zeroize> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

/// Serde adapters for `Secret<String>` fields. `Secret` deliberately has no `Serialize` impl of its own; a struct has
/// to opt in per field with `#[serde(with = "secret_string")]`, which keeps accidental serialization of secrets into
/// responses or logs from compiling.
pub mod secret_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Secret;

    pub fn serialize<S: Serializer>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.reveal())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Secret<String>, D::Error> {
        String::deserialize(deserializer).map(Secret::new)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use crate::Secret;

        pub fn serialize<S: Serializer>(secret: &Option<Secret<String>>, serializer: S) -> Result<S::Ok, S::Error> {
            match secret {
                Some(s) => serializer.serialize_some(s.reveal()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Secret<String>>, D::Error> {
            Option::<String>::deserialize(deserializer).map(|v| v.map(Secret::new))
        }
    }
}
