use crate::error::NameCollision;
use std::collections::HashMap;

const NAME_SEPARATOR: &str = "__";

/// Keep only ASCII alphanumerics and underscores
pub fn sanitize_symbol(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// `<Symbol>__<originId>`. Distinct origins never share a name, whatever the
/// symbol; an empty symbol still yields a usable `__<originId>`.
pub fn unique_name(origin_id: &str, symbol_name: &str) -> String {
    format!("{}{NAME_SEPARATOR}{origin_id}", sanitize_symbol(symbol_name))
}

/// Tracks names handed out in one run so an overwrite is caught instead of
/// silently replacing another unit's output.
#[derive(Debug, Default)]
pub struct NameRegistry {
    claimed: HashMap<String, String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: &str, origin_id: &str) -> Result<(), NameCollision> {
        if let Some(first) = self.claimed.get(name) {
            return Err(NameCollision {
                name: name.to_string(),
                first: first.clone(),
                second: origin_id.to_string(),
            });
        }
        self.claimed.insert(name.to_string(), origin_id.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
