use crate::component::ComponentRef;
use crate::config::ConfigError;

/// One old → new rewrite. `new == None` deletes matching favorites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub old: ComponentRef,
    pub new: Option<ComponentRef>,
}

/// Ordered list of component rewrites applied by the remapping step.
///
/// Built from two parallel string arrays, `old_components[i]` mapping to
/// `new_components[i]`. Each entry is `package/class`; an empty new entry
/// means "remove the favorite".
///
/// ```
/// use oti_migrate::ComponentMappingTable;
///
/// let table = ComponentMappingTable::from_arrays(
///     Some(&["com.old/.Main", "com.gone/.Legacy"][..]),
///     Some(&["com.new/.Main", ""][..]),
/// )
/// .unwrap();
/// assert_eq!(table.len(), 2);
/// assert!(table.entries()[1].new.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMappingTable {
    entries: Vec<MappingEntry>,
}

impl ComponentMappingTable {
    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit entries.
    pub fn from_entries(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    /// Build from the parallel `old_components` / `new_components` arrays.
    ///
    /// If either array is missing or empty the table is empty. Arrays of
    /// different lengths, or an entry without a `/`, are configuration
    /// errors.
    pub fn from_arrays<S: AsRef<str>>(
        old: Option<&[S]>,
        new: Option<&[S]>,
    ) -> Result<Self, ConfigError> {
        let (old, new) = match (old, new) {
            (Some(o), Some(n)) if !o.is_empty() && !n.is_empty() => (o, n),
            _ => return Ok(Self::empty()),
        };
        if old.len() != new.len() {
            return Err(ConfigError::LengthMismatch {
                old: old.len(),
                new: new.len(),
            });
        }

        let mut entries = Vec::with_capacity(old.len());
        for (index, (o, n)) in old.iter().zip(new).enumerate() {
            let old_ref = ComponentRef::parse(o.as_ref()).map_err(|source| {
                ConfigError::InvalidEntry {
                    list: "old_components",
                    index,
                    source,
                }
            })?;
            let new_ref = match n.as_ref() {
                "" => None,
                s => Some(ComponentRef::parse(s).map_err(|source| {
                    ConfigError::InvalidEntry {
                        list: "new_components",
                        index,
                        source,
                    }
                })?),
            };
            entries.push(MappingEntry {
                old: old_ref,
                new: new_ref,
            });
        }
        Ok(Self { entries })
    }

    /// Entries in table order.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentError;

    fn table(old: &[&str], new: &[&str]) -> Result<ComponentMappingTable, ConfigError> {
        ComponentMappingTable::from_arrays(Some(old), Some(new))
    }

    #[test]
    fn resolves_shorthand_and_deletes() {
        let t = table(&["com.old/.Main", "com.x/com.x.A"], &["com.new/.Main", ""]).unwrap();
        assert_eq!(
            t.entries(),
            &[
                MappingEntry {
                    old: ComponentRef::new("com.old", "com.old.Main"),
                    new: Some(ComponentRef::new("com.new", "com.new.Main")),
                },
                MappingEntry {
                    old: ComponentRef::new("com.x", "com.x.A"),
                    new: None,
                },
            ]
        );
    }

    #[test]
    fn missing_or_empty_arrays_give_empty_table() {
        let none: Option<&[&str]> = None;
        assert!(ComponentMappingTable::from_arrays(none, Some(&["a/b"][..]))
            .unwrap()
            .is_empty());
        assert!(ComponentMappingTable::from_arrays(Some(&["a/b"][..]), none)
            .unwrap()
            .is_empty());
        assert!(table(&[], &["a/b"]).unwrap().is_empty());
        assert!(table(&["a/b"], &[]).unwrap().is_empty());
    }

    #[test]
    fn length_mismatch_is_fatal() {
        assert!(matches!(
            table(&["a/.A", "b/.B"], &["c/.C"]),
            Err(ConfigError::LengthMismatch { old: 2, new: 1 })
        ));
    }

    #[test]
    fn malformed_entries_are_fatal() {
        match table(&["a/.A", "broken"], &["c/.C", ""]) {
            Err(ConfigError::InvalidEntry {
                list,
                index,
                source,
            }) => {
                assert_eq!(list, "old_components");
                assert_eq!(index, 1);
                assert_eq!(source, ComponentError::MissingSeparator("broken".into()));
            }
            other => panic!("unexpected: {other:?}"),
        }

        assert!(matches!(
            table(&["a/.A"], &["nope"]),
            Err(ConfigError::InvalidEntry {
                list: "new_components",
                index: 0,
                ..
            })
        ));
    }
}
