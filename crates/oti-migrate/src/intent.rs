use thiserror::Error;

use crate::component::ComponentRef;

/// `Intent.ACTION_MAIN`.
pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
/// `Intent.ACTION_VIEW`, implied by descriptors that are a bare data URI.
pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
/// `Intent.CATEGORY_LAUNCHER`.
pub const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";

const FRAGMENT_START: &str = "#Intent;";
const FRAGMENT_END: &str = "end";

/// Error parsing a serialized intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentParseError {
    /// The `#Intent;` fragment never reaches its `end` token.
    #[error("intent fragment is not terminated by `end`")]
    Unterminated,
    /// A field is not of the form `key=value`.
    #[error("malformed intent field `{0}`")]
    MalformedField(String),
    /// A value contains an invalid percent escape or invalid UTF-8.
    #[error("invalid escape in `{0}`")]
    BadEscape(String),
}

/// A launcher intent in its URI serialization.
///
/// The format is `<data>#Intent;key=value;...;end`. Values are
/// percent-encoded. The fields the migration cares about (`action`,
/// `category`, `component`) are decoded on parse; every field is kept in
/// its original raw form and order, so [`to_uri`](Self::to_uri) reproduces
/// the input exactly unless the component was replaced.
///
/// A string without an `#Intent;` fragment is a bare data URI, which
/// implies [`ACTION_VIEW`] and has no component. A `component` value that is
/// not `package/class` reads as no component; the raw field is kept.
///
/// ```
/// use oti_migrate::{ComponentRef, IntentDescriptor};
///
/// let uri = "#Intent;action=android.intent.action.MAIN;\
///            category=android.intent.category.LAUNCHER;\
///            launchFlags=0x10200000;component=com.old/.Main;end";
/// let mut intent = IntentDescriptor::parse(uri).unwrap();
/// assert_eq!(intent.component().unwrap().class(), "com.old.Main");
///
/// intent.set_component(ComponentRef::parse("com.new/.Main").unwrap());
/// assert_eq!(
///     intent.to_uri(),
///     "#Intent;action=android.intent.action.MAIN;\
///      category=android.intent.category.LAUNCHER;\
///      launchFlags=0x10200000;component=com.new/.Main;end"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentDescriptor {
    data: String,
    /// `None` for a bare data URI.
    fields: Option<Vec<(String, String)>>,
    /// Anything after the `end` token.
    tail: String,
    action: Option<String>,
    categories: Vec<String>,
    component: Option<ComponentRef>,
}

impl IntentDescriptor {
    /// Parse a serialized intent.
    pub fn parse(uri: &str) -> Result<Self, IntentParseError> {
        let hash = match uri.rfind('#') {
            Some(i) if uri[i..].starts_with(FRAGMENT_START) => i,
            _ => {
                return Ok(Self {
                    data: uri.to_string(),
                    fields: None,
                    tail: String::new(),
                    action: Some(ACTION_VIEW.to_string()),
                    categories: Vec::new(),
                    component: None,
                })
            }
        };

        let body = &uri[hash + FRAGMENT_START.len()..];
        let mut fields = Vec::new();
        let mut action = None;
        let mut categories = Vec::new();
        let mut component = None;
        let mut tail = None;

        let mut pos = 0;
        while pos <= body.len() {
            let rest = &body[pos..];
            let token_len = rest.find(';').unwrap_or(rest.len());
            let token = &rest[..token_len];

            if token == FRAGMENT_END {
                tail = Some(rest[token_len..].to_string());
                break;
            }
            if token_len == rest.len() {
                // Ran out of input without seeing `end`.
                break;
            }

            let (key, raw) = token
                .split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| IntentParseError::MalformedField(token.to_string()))?;

            match key {
                "action" => action = Some(decode(raw)?),
                "category" => categories.push(decode(raw)?),
                "component" => component = ComponentRef::parse(&decode(raw)?).ok(),
                _ => {}
            }
            fields.push((key.to_string(), raw.to_string()));
            pos += token_len + 1;
        }

        let tail = tail.ok_or(IntentParseError::Unterminated)?;
        Ok(Self {
            data: uri[..hash].to_string(),
            fields: Some(fields),
            tail,
            action,
            categories,
            component,
        })
    }

    /// The intent action, if any.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Categories in the order they appear.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Whether `category` is among the categories.
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// The explicit target component, if any.
    pub fn component(&self) -> Option<&ComponentRef> {
        self.component.as_ref()
    }

    /// The data URI preceding the fragment (empty if none).
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Replace the target component, leaving every other field untouched.
    ///
    /// Existing `component` fields are rewritten in place; if there is none
    /// the field is appended. A bare data URI is promoted to the fragment
    /// form carrying its implied `ACTION_VIEW`.
    pub fn set_component(&mut self, component: ComponentRef) {
        let encoded = encode_component(&component.to_short_string());
        let fields = self.fields.get_or_insert_with(|| {
            vec![("action".to_string(), encode(ACTION_VIEW, ""))]
        });

        let mut replaced = false;
        for (key, value) in fields.iter_mut() {
            if key == "component" {
                value.clone_from(&encoded);
                replaced = true;
            }
        }
        if !replaced {
            fields.push(("component".to_string(), encoded));
        }
        self.component = Some(component);
    }

    /// Serialize back to the URI form.
    pub fn to_uri(&self) -> String {
        let Some(fields) = &self.fields else {
            return self.data.clone();
        };
        let mut out = String::with_capacity(self.data.len() + 64);
        out.push_str(&self.data);
        out.push_str(FRAGMENT_START);
        for (key, value) in fields {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push(';');
        }
        out.push_str(FRAGMENT_END);
        out.push_str(&self.tail);
        out
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'_' | b'-' | b'!' | b'.' | b'~' | b'\'' | b'(' | b')' | b'*'
        )
}

fn encode(s: &str, allow: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) || allow.as_bytes().contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn encode_component(short: &str) -> String {
    encode(short, "/")
}

fn decode(raw: &str) -> Result<String, IntentParseError> {
    let bad = || IntentParseError::BadEscape(raw.to_string());
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw.get(i + 1..i + 3).ok_or_else(bad)?;
            let byte = u8::from_str_radix(hex, 16).map_err(|_| bad())?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LAUNCHER_URI: &str = "#Intent;action=android.intent.action.MAIN;\
        category=android.intent.category.LAUNCHER;launchFlags=0x10200000;\
        component=com.android.contacts/.DialtactsActivity;end";

    #[test]
    fn parse_launcher_intent() {
        let intent = IntentDescriptor::parse(LAUNCHER_URI).unwrap();
        assert_eq!(intent.action(), Some(ACTION_MAIN));
        assert!(intent.has_category(CATEGORY_LAUNCHER));
        let c = intent.component().unwrap();
        assert_eq!(c.package(), "com.android.contacts");
        assert_eq!(c.class(), "com.android.contacts.DialtactsActivity");
        assert_eq!(intent.data(), "");
    }

    #[test]
    fn unmodified_roundtrip_is_exact() {
        for uri in [
            LAUNCHER_URI,
            "tel:123#Intent;action=android.intent.action.CALL;end",
            "#Intent;component=a/b.C;S.title=Hello%20World;i.count=3;end",
            "#Intent;end",
        ] {
            assert_eq!(IntentDescriptor::parse(uri).unwrap().to_uri(), uri);
        }
    }

    #[test]
    fn bare_data_uri_implies_view() {
        let intent = IntentDescriptor::parse("http://example.com/#top").unwrap();
        assert_eq!(intent.action(), Some(ACTION_VIEW));
        assert!(intent.component().is_none());
        assert!(intent.categories().is_empty());
        assert_eq!(intent.to_uri(), "http://example.com/#top");
    }

    #[test]
    fn set_component_preserves_other_fields() {
        let mut intent = IntentDescriptor::parse(
            "content://x#Intent;action=android.intent.action.MAIN;launchFlags=0x1;\
             component=com.old/.Main;S.k=v;end",
        )
        .unwrap();
        intent.set_component(ComponentRef::parse("com.new/.Main").unwrap());
        assert_eq!(
            intent.to_uri(),
            "content://x#Intent;action=android.intent.action.MAIN;launchFlags=0x1;\
             component=com.new/.Main;S.k=v;end"
        );
        assert_eq!(intent.component().unwrap().class(), "com.new.Main");
    }

    #[test]
    fn set_component_without_shorthand() {
        let mut intent =
            IntentDescriptor::parse("#Intent;action=android.intent.action.MAIN;end").unwrap();
        intent.set_component(ComponentRef::new("com.new", "org.other.Main"));
        assert_eq!(
            intent.to_uri(),
            "#Intent;action=android.intent.action.MAIN;component=com.new/org.other.Main;end"
        );
    }

    #[test]
    fn set_component_on_bare_uri_promotes_to_fragment() {
        let mut intent = IntentDescriptor::parse("http://x").unwrap();
        intent.set_component(ComponentRef::parse("com.b/.B").unwrap());
        let uri = intent.to_uri();
        assert_eq!(
            uri,
            "http://x#Intent;action=android.intent.action.VIEW;component=com.b/.B;end"
        );
        let reparsed = IntentDescriptor::parse(&uri).unwrap();
        assert_eq!(reparsed.action(), Some(ACTION_VIEW));
        assert_eq!(reparsed.component(), intent.component());
    }

    #[test]
    fn component_escapes_decode() {
        let intent =
            IntentDescriptor::parse("#Intent;component=com.a/.Outer%24Inner;end").unwrap();
        assert_eq!(intent.component().unwrap().class(), "com.a.Outer$Inner");

        let mut copy = intent.clone();
        copy.set_component(intent.component().unwrap().clone());
        assert_eq!(copy.to_uri(), "#Intent;component=com.a/.Outer%24Inner;end");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse_err("#Intent;action=x;"), IntentParseError::Unterminated);
        assert_eq!(parse_err("#Intent;action=x"), IntentParseError::Unterminated);
        assert_eq!(
            IntentParseError::MalformedField("garbage".into()),
            parse_err("#Intent;garbage;end")
        );
        assert_eq!(
            IntentParseError::MalformedField("=v".into()),
            parse_err("#Intent;=v;end")
        );
        assert_eq!(
            IntentParseError::BadEscape("a%2".into()),
            parse_err("#Intent;action=a%2;end")
        );
    }

    #[test]
    fn unflattenable_component_reads_as_absent() {
        let uri = "#Intent;action=android.intent.action.MAIN;component=nocomponent;end";
        let intent = IntentDescriptor::parse(uri).unwrap();
        assert_eq!(intent.action(), Some(ACTION_MAIN));
        assert!(intent.component().is_none());
        assert_eq!(intent.to_uri(), uri);

        let empty_class = IntentDescriptor::parse("#Intent;component=com.a/;end").unwrap();
        assert!(empty_class.component().is_none());
    }

    fn parse_err(uri: &str) -> IntentParseError {
        IntentDescriptor::parse(uri).unwrap_err()
    }

    fn ident() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}(\\.[a-z][a-z0-9]{0,6}){0,2}"
    }

    proptest! {
        #[test]
        fn rewrite_keeps_everything_but_component(
            pkg in ident(),
            cls in "[A-Z][A-Za-z0-9$]{0,8}",
            new_pkg in ident(),
            flags in 0u32..0x2000_0000,
            extra in "[ -~]{0,12}",
        ) {
            let old = ComponentRef::new(pkg.clone(), format!(".{cls}"));
            let uri = format!(
                "#Intent;action={};category={};launchFlags=0x{flags:x};component={};S.note={};end",
                ACTION_MAIN,
                CATEGORY_LAUNCHER,
                encode_component(&old.to_short_string()),
                encode(&extra, ""),
            );
            let mut intent = IntentDescriptor::parse(&uri).unwrap();
            prop_assert_eq!(intent.to_uri(), uri.clone());
            prop_assert_eq!(intent.component(), Some(&old));

            let new = ComponentRef::new(new_pkg, format!(".{cls}"));
            intent.set_component(new.clone());
            let rewritten = IntentDescriptor::parse(&intent.to_uri()).unwrap();
            prop_assert_eq!(rewritten.component(), Some(&new));
            prop_assert_eq!(rewritten.action(), Some(ACTION_MAIN));
            prop_assert_eq!(rewritten.categories(), &[CATEGORY_LAUNCHER.to_string()][..]);
            let decoded_extra = rewritten
                .fields
                .as_ref()
                .unwrap()
                .iter()
                .find(|(k, _)| k == "S.note")
                .map(|(_, v)| decode(v).unwrap());
            prop_assert_eq!(decoded_extra, Some(extra));
        }
    }
}
