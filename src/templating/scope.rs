//! The inclusion-scope stack.
//!
//! Tera offers one flat variable namespace per render, so nested template
//! blocks need their own bookkeeping to pass data down a chain of inclusions.
//! [`ScopeStack`] records one [`InclusionInstance`] per block in the order
//! blocks *begin* rendering across the whole page, not in tree order.
//!
//! # Resolution parent
//!
//! The parent an instance resolves `props.<key>` references against is the
//! entry immediately before it in the stack. For a straight chain of nested
//! blocks that is the syntactic parent. For a block opened after a sibling
//! has finished, it is that sibling: finished entries stay on the stack until
//! the oldest entry completes, at which point the whole stack is cleared.
//!
//! ```text
//! {% template a props.x: "v" %}         stack: [a]
//!   {% template b x: props.x %}         stack: [a, b]       b.x -> a.x = "v"
//!     {% template c title: props.x %}   stack: [a, b, c]    c.title -> b.x = "v"
//!     {% endtemplate %}
//!   {% endtemplate %}
//! {% endtemplate %}                     stack: []           (a was oldest)
//! ```
//!
//! A reference found to be another reference is followed one entry further
//! back, with the referenced key, until a concrete value turns up. A
//! reference that cannot be resolved is dropped from the bundle.

use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::markdown::Metadata;

/// Opaque identifier of one block evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An attribute as recorded on the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopedValue {
    /// A resolved value.
    Concrete(Value),
    /// Deferred `props.<key>` reference.
    Reference(String),
}

/// One active or finished-but-not-cleared block evaluation.
#[derive(Debug, Clone)]
pub struct InclusionInstance {
    pub id: InstanceId,
    /// Position in global begin order among tracked instances.
    pub depth_index: usize,
    pub template_name: String,
    pub attributes: BTreeMap<String, ScopedValue>,
}

impl InclusionInstance {
    /// Keys whose value is still a deferred reference.
    pub fn unresolved_prop_refs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(key, value)| match value {
            ScopedValue::Reference(target) => Some((key.as_str(), target.as_str())),
            ScopedValue::Concrete(_) => None,
        })
    }
}

/// Stack of inclusion instances for one page render.
///
/// Owned by a single render pass; never shared between pages.
#[derive(Debug, Default)]
pub struct ScopeStack {
    entries: Vec<InclusionInstance>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instance for `template_name` and return its id.
    pub fn begin_instance(&mut self, template_name: &str) -> InstanceId {
        let id = InstanceId::generate();
        let depth_index = self.entries.len();
        tracing::debug!("Begin '{}' at depth {} ({})", template_name, depth_index, id);
        self.entries.push(InclusionInstance {
            id,
            depth_index,
            template_name: template_name.to_string(),
            attributes: BTreeMap::new(),
        });
        id
    }

    /// Merge `attrs` into the instance's attributes. Later keys win.
    pub fn record<I>(&mut self, id: InstanceId, attrs: I)
    where
        I: IntoIterator<Item = (String, ScopedValue)>,
    {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.attributes.extend(attrs),
            None => tracing::warn!("Ignoring attributes for unknown inclusion instance {}", id),
        }
    }

    /// Resolve the instance's prop references against earlier entries.
    ///
    /// Returns only the references that resolved, keyed by the attribute
    /// name they were declared under.
    pub fn evaluate_props(&self, id: InstanceId) -> Metadata {
        let mut resolved = Metadata::new();
        let Some(position) = self.position(id) else {
            tracing::warn!("Cannot resolve props for unknown inclusion instance {}", id);
            return resolved;
        };
        let instance = &self.entries[position];

        for (key, target) in instance.unresolved_prop_refs() {
            match self.resolve_reference(position, target) {
                Some(value) => {
                    resolved.insert(key.to_string(), value.clone());
                }
                None => tracing::debug!(
                    "Prop reference '{}: props.{}' in '{}' did not resolve; omitting it",
                    key,
                    target,
                    instance.template_name
                ),
            }
        }

        resolved
    }

    /// Follow `props.<target>` backward from the entry at `position`.
    fn resolve_reference(&self, position: usize, target: &str) -> Option<&Value> {
        let mut index = position.checked_sub(1)?;
        let mut key = target;
        loop {
            match self.entries[index].attributes.get(key)? {
                ScopedValue::Concrete(value) => return Some(value),
                ScopedValue::Reference(next) => {
                    index = index.checked_sub(1)?;
                    key = next;
                }
            }
        }
    }

    /// Mark an instance finished.
    ///
    /// Clears the whole stack if `id` is the oldest entry and returns whether
    /// it did.
    pub fn end_instance(&mut self, id: InstanceId) -> bool {
        if self.entries.first().is_some_and(|entry| entry.id == id) {
            tracing::debug!("Outermost block finished; clearing {} instance(s)", self.entries.len());
            self.entries.clear();
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: InstanceId) -> Option<&InclusionInstance> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    fn position(&self, id: InstanceId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Template names of all tracked instances, oldest first.
    pub fn chain(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.template_name.clone()).collect()
    }
}
