use crate::component::ComponentRef;
use crate::intent::{IntentDescriptor, IntentParseError, ACTION_MAIN, CATEGORY_LAUNCHER};
use crate::mapping::ComponentMappingTable;

/// What to do with one favorite row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    /// Write this serialized intent back to the row.
    Update(String),
    /// Remove the row.
    Delete,
}

/// Decides, per favorite, which rewrites of the mapping table apply.
///
/// A favorite matches an entry when it is a launcher shortcut
/// (`ACTION_MAIN` with `CATEGORY_LAUNCHER`) whose explicit component equals
/// the entry's old component. Every entry is checked against the favorite's
/// *original* component, in table order, so several entries can fire for one
/// row; a delete ends the plan.
pub struct RecordMatcher<'a> {
    table: &'a ComponentMappingTable,
}

impl<'a> RecordMatcher<'a> {
    pub fn new(table: &'a ComponentMappingTable) -> Self {
        Self { table }
    }

    /// Whether `intent` launches `old` from the home screen.
    pub fn matches(intent: &IntentDescriptor, old: &ComponentRef) -> bool {
        intent.action() == Some(ACTION_MAIN)
            && intent.has_category(CATEGORY_LAUNCHER)
            && intent.component() == Some(old)
    }

    /// Parse `intent_uri` and list the store actions to apply, in order.
    ///
    /// An empty list means the row is left alone.
    pub fn plan(&self, intent_uri: &str) -> Result<Vec<RecordAction>, IntentParseError> {
        let mut intent = IntentDescriptor::parse(intent_uri)?;
        let original = intent.clone();

        let mut actions = Vec::new();
        for entry in self.table.entries() {
            if !Self::matches(&original, &entry.old) {
                continue;
            }
            match &entry.new {
                None => {
                    tracing::debug!(old = %entry.old, "favorite scheduled for removal");
                    actions.push(RecordAction::Delete);
                    break;
                }
                Some(new) => {
                    tracing::debug!(old = %entry.old, new = %new, "favorite scheduled for rewrite");
                    intent.set_component(new.clone());
                    actions.push(RecordAction::Update(intent.to_uri()));
                }
            }
        }
        Ok(actions)
    }
}
