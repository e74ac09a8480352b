//! General helpers, also exposed to modules as the `$utils` capability.

pub mod merge;
pub mod string;
pub mod uid;

pub use merge::{deep_assign, deep_merge};
pub use uid::{Uid36, Uid62, UidInfo};

use crate::Error;
use serde_json::Value;

/// The `$utils` builtin: stateless helpers plus id generator factories.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utils;

impl Utils {
    pub fn camel(&self, input: &str, capitalize: bool) -> String {
        string::camel(input, capitalize)
    }

    pub fn snake(&self, input: &str) -> String {
        string::snake(input, "_")
    }

    pub fn kebab(&self, input: &str) -> String {
        string::kebab(input)
    }

    pub fn deep_assign(&self, target: &mut Value, source: &Value) {
        merge::deep_assign(target, source)
    }

    pub fn deep_merge(&self, base: &Value, overlay: &Value) -> Value {
        merge::deep_merge(base, overlay)
    }

    pub fn uid62(&self, code: u64) -> Uid62 {
        Uid62::new(code)
    }

    pub fn uid36(&self, prefix: Option<char>) -> Result<Uid36, Error> {
        Uid36::new(prefix)
    }
}
