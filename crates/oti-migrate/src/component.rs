use core::fmt;

use thiserror::Error;

/// Error parsing a `package/class` component string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// The string has no `/` separating package and class.
    #[error("component `{0}` has no '/' separator")]
    MissingSeparator(String),
    /// Package or class is empty.
    #[error("component `{0}` has an empty package or class")]
    EmptyPart(String),
}

/// A `(package, class)` pair naming a launchable activity.
///
/// The class is always stored fully qualified: the `.Suffix` shorthand is
/// expanded against the package when parsing.
///
/// ```
/// use oti_migrate::ComponentRef;
///
/// let c = ComponentRef::parse("com.android.deskclock/.DeskClock").unwrap();
/// assert_eq!(c.class(), "com.android.deskclock.DeskClock");
/// assert_eq!(c.to_short_string(), "com.android.deskclock/.DeskClock");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentRef {
    package: String,
    class: String,
}

impl ComponentRef {
    /// Build from already-resolved parts. A class starting with `.` is
    /// still expanded against `package`.
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        let package = package.into();
        let class = class.into();
        let class = if class.starts_with('.') {
            format!("{package}{class}")
        } else {
            class
        };
        Self { package, class }
    }

    /// Parse `package/class`, splitting on the first `/`.
    pub fn parse(s: &str) -> Result<Self, ComponentError> {
        let (package, class) = s
            .split_once('/')
            .ok_or_else(|| ComponentError::MissingSeparator(s.to_string()))?;
        if package.is_empty() || class.is_empty() || class == "." {
            return Err(ComponentError::EmptyPart(s.to_string()));
        }
        Ok(Self::new(package, class))
    }

    /// The package (namespace) part.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The fully qualified class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// `package/class`, abbreviating the class to `.Suffix` when it lives
    /// inside the package.
    pub fn to_short_string(&self) -> String {
        match self.class.strip_prefix(self.package.as_str()) {
            Some(rest) if rest.starts_with('.') => format!("{}/{}", self.package, rest),
            _ => format!("{}/{}", self.package, self.class),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_class() {
        let c = ComponentRef::parse("com.old/com.old.Main").unwrap();
        assert_eq!(c.package(), "com.old");
        assert_eq!(c.class(), "com.old.Main");
    }

    #[test]
    fn parse_shorthand_class() {
        let c = ComponentRef::parse("com.old/.Main").unwrap();
        assert_eq!(c, ComponentRef::new("com.old", "com.old.Main"));
    }

    #[test]
    fn parse_splits_on_first_slash() {
        let c = ComponentRef::parse("com.a/b/c").unwrap();
        assert_eq!(c.package(), "com.a");
        assert_eq!(c.class(), "b/c");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            ComponentRef::parse("com.old.Main"),
            Err(ComponentError::MissingSeparator("com.old.Main".into()))
        );
        assert!(matches!(
            ComponentRef::parse("/.Main"),
            Err(ComponentError::EmptyPart(_))
        ));
        assert!(matches!(
            ComponentRef::parse("com.old/"),
            Err(ComponentError::EmptyPart(_))
        ));
    }

    #[test]
    fn short_string_only_abbreviates_inside_package() {
        assert_eq!(
            ComponentRef::new("com.a", "com.a.Main").to_short_string(),
            "com.a/.Main"
        );
        assert_eq!(
            ComponentRef::new("com.a", "com.b.Main").to_short_string(),
            "com.a/com.b.Main"
        );
        // Prefix match must end on a package boundary.
        assert_eq!(
            ComponentRef::new("com.a", "com.ab.Main").to_short_string(),
            "com.a/com.ab.Main"
        );
    }

    #[test]
    fn display_is_fully_qualified() {
        let c = ComponentRef::parse("com.new/.Main").unwrap();
        assert_eq!(c.to_string(), "com.new/com.new.Main");
    }
}
