//! Declarative registration applied while a document is deserialized.

use crate::context::Context;
use crate::error::Result;
use crate::identity::{identifier_of, Declared};
use crate::registry::{global, TypeOptions};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::info;

/// How a [`Reg`] writes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegAction {
    /// Insert only if the name is not taken.
    Register,
    /// Insert or overwrite.
    #[default]
    Set,
}

impl RegAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegAction::Register => "register",
            RegAction::Set => "set",
        }
    }
}

impl fmt::Display for RegAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RegAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let action = String::deserialize(deserializer)?;
        match action.to_ascii_lowercase().as_str() {
            "register" => Ok(RegAction::Register),
            "set" | "" => Ok(RegAction::Set),
            _ => Err(D::Error::unknown_variant(&action, &["register", "set"])),
        }
    }
}

/// A declarative registration: deserializing it writes `value` under `name`
/// into the global registry.
///
/// Shape: `{"name": ..., "value": ..., "action": "register" | "set"}`, with
/// `set` as the default action. The type is registered first if needed.
/// If the write fails (for example `register` on a taken name) the
/// deserialization fails and the registry is left as it was.
///
/// ```
/// use typereg::{global, Context, Reg};
///
/// let reg: Reg<u32> = serde_json::from_str(r#"{"name": "workers", "value": 8}"#).unwrap();
/// assert_eq!(global::get::<u32>(&Context::background(), "workers").unwrap(), 8);
/// assert_eq!(reg.value, 8);
/// ```
#[derive(Clone, PartialEq)]
pub struct Reg<T> {
    pub name: String,
    pub value: T,
    pub action: RegAction,
}

impl<T: Declared> Reg<T> {
    /// The value currently registered under this name, which may differ
    /// from the one this declaration wrote.
    pub fn current_value(&self, ctx: &Context) -> Result<T> {
        global::get::<T>(ctx, &self.name)
    }

    /// Perform the registration against the global registry.
    pub fn apply(&self, ctx: &Context) -> Result<()> {
        global::register_type::<T>(TypeOptions::new())?;
        match self.action {
            RegAction::Register => global::register(ctx, &self.name, self.value.clone()),
            RegAction::Set => global::set(ctx, &self.name, self.value.clone()),
        }
    }
}

impl<T> fmt::Debug for Reg<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reg")
            .field("name", &self.name)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct RegRepr<T> {
    name: String,
    value: T,
    #[serde(default)]
    action: RegAction,
}

impl<'de, T> Deserialize<'de> for Reg<T>
where
    T: Declared + DeserializeOwned,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let RegRepr { name, value, action } = RegRepr::<T>::deserialize(deserializer)?;
        let reg = Reg { name, value, action };
        let ctx = super::unmarshal_context();
        reg.apply(&ctx).map_err(|err| {
            D::Error::custom(format!(
                "{} Reg<{}> {:?}: {}",
                reg.action,
                identifier_of::<T>(),
                reg.name,
                err
            ))
        })?;
        info!("Applied {} Reg<{}> {:?}", reg.action, identifier_of::<T>(), reg.name);
        Ok(reg)
    }
}

impl<T: Serialize> Serialize for Reg<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Reg", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("action", &self.action)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        let parse = |s: &str| serde_json::from_value::<RegAction>(serde_json::json!(s));
        assert_eq!(parse("REGISTER").unwrap(), RegAction::Register);
        assert_eq!(parse("Set").unwrap(), RegAction::Set);
        assert_eq!(parse("").unwrap(), RegAction::Set);
        assert!(parse("upsert").is_err());
    }

    #[test]
    fn test_apply_honours_deadline() {
        let reg = Reg {
            name: "reg-expired".to_string(),
            value: 7u16,
            action: RegAction::Set,
        };
        let err = reg.apply(&Context::with_timeout(std::time::Duration::ZERO)).unwrap_err();
        assert!(matches!(err.root(), crate::RegistryError::Timeout(_)), "{err}");
        assert!(reg.current_value(&Context::background()).unwrap_err().is_not_found());
    }
}
