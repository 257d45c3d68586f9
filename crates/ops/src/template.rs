//! Variable substitution for command lines, paths and text templates
//!
//! Placeholders are `$NAME` or `${NAME}` where `NAME` starts with a letter or
//! underscore followed by letters, digits or underscores. `$$` is a literal
//! dollar. Placeholders naming an undefined variable are left in the output
//! untouched and reported in [`Rendered::unresolved`]; a `$` that does not
//! start a placeholder is copied as is.

use relval_errors::OpsError;
use std::collections::BTreeMap;

pub const PLATFORM: &str = "PLATFORM";
pub const ARCH: &str = "ARCH";
pub const VERSION: &str = "VERSION";
pub const URL: &str = "URL";
pub const DESTDIR: &str = "DESTDIR";
pub const MODULEFILE_DEPS: &str = "MODULEFILE_DEPS";
pub const SESSIONTAG: &str = "SESSIONTAG";
pub const RESULTS_URL: &str = "RESULTS_URL";
pub const STATUS_STR: &str = "STATUS_STR";
pub const VALIDATION_STR: &str = "VALIDATION_STR";

/// Environment Modules file installed for each dispatched package
///
/// `$version` and the `$::env(...)` references are Tcl and stay verbatim.
pub const MODULE_FILE_TEMPLATE: &str = r#"#%Module1.0
proc ModulesHelp { } {
  global version
  puts stderr "This module is for an AliRoot version to be validated."
}
set version $VERSION
module-whatis "AliRoot version to be validated"
module load BASE/1.0 $MODULEFILE_DEPS
setenv ALIROOT_VERSION $version
setenv ALICE $::env(BASEDIR)/AliRoot
setenv ALIROOT_RELEASE $::env(ALIROOT_VERSION)
setenv ALICE_ROOT $::env(BASEDIR)/AliRoot/$::env(ALIROOT_RELEASE)
prepend-path PATH $::env(ALICE_ROOT)/bin/tgt_$::env(ALICE_TARGET_EXT)
prepend-path LD_LIBRARY_PATH $::env(ALICE_ROOT)/lib/tgt_$::env(ALICE_TARGET_EXT)
"#;

pub const STARTED_SUBJECT: &str = "[relval] Validation started: $VERSION";
pub const STARTED_BODY: &str = "The following validation has started:\n\n$VALIDATION_STR";
pub const FINISHED_SUBJECT: &str = "[relval] Validation $STATUS_STR: $VERSION";
pub const FINISHED_BODY: &str = "Validation for $VERSION: $STATUS_STR.

Find the results here:

  $RESULTS_URL

Validation details:

$VALIDATION_STR";

/// Named substitution values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars(BTreeMap<String, String>);

impl Vars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Set `key` only when a value is present
    pub fn set_opt(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Output of [`render`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Undefined variable names, in order of first appearance
    pub unresolved: Vec<String>,
}

impl Rendered {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// The rendered text, or an error naming every undefined variable
    ///
    /// # Errors
    ///
    /// Returns `OpsError::UnresolvedPlaceholders` if any placeholder was left.
    pub fn require(self, template: &str) -> Result<String, OpsError> {
        if self.unresolved.is_empty() {
            Ok(self.text)
        } else {
            Err(OpsError::UnresolvedPlaceholders {
                template: template.to_string(),
                keys: self.unresolved,
            })
        }
    }
}

/// Substitute `vars` into `template`
#[must_use]
pub fn render(template: &str, vars: &Vars) -> Rendered {
    let mut text = String::with_capacity(template.len());
    let mut unresolved: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        text.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            text.push('$');
            rest = tail;
            continue;
        }

        let (name, consumed) = if let Some(inner) = after.strip_prefix('{') {
            match inner.find('}') {
                Some(end) if is_identifier(&inner[..end]) => (Some(&inner[..end]), end + 2),
                _ => (None, 0),
            }
        } else {
            let len = identifier_len(after);
            ((len > 0).then(|| &after[..len]), len)
        };

        let Some(name) = name else {
            text.push('$');
            rest = after;
            continue;
        };

        match vars.get(name) {
            Some(value) => text.push_str(value),
            None => {
                text.push_str(&rest[pos..=pos + consumed]);
                if !unresolved.iter().any(|k| k == name) {
                    unresolved.push(name.to_string());
                }
            }
        }
        rest = &after[consumed..];
    }

    text.push_str(rest);
    Rendered { text, unresolved }
}

fn identifier_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
            1 + bytes[1..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                .count()
        }
        _ => 0,
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vars() -> Vars {
        let mut vars = Vars::new();
        vars.set(VERSION, "v5-05-Rev-01")
            .set(ARCH, "x86_64")
            .set(DESTDIR, "/opt/alice/Packages/AliRoot/v5-05-Rev-01");
        vars
    }

    #[test]
    fn both_placeholder_forms() {
        let out = render("/opt/$ARCH/AliRoot/${VERSION}-test", &vars());
        assert_eq!(out.text, "/opt/x86_64/AliRoot/v5-05-Rev-01-test");
        assert!(out.is_complete());
    }

    #[test]
    fn unknown_names_stay_literal() {
        let out = render("run $SESSIONTAG in ${DESTDIR} on $PLATFORM/$SESSIONTAG", &vars());
        assert_eq!(
            out.text,
            "run $SESSIONTAG in /opt/alice/Packages/AliRoot/v5-05-Rev-01 on $PLATFORM/$SESSIONTAG"
        );
        assert_eq!(out.unresolved, vec!["SESSIONTAG", "PLATFORM"]);

        let err = out.require("validation.run_cmd").unwrap_err();
        assert!(err.to_string().contains("SESSIONTAG, PLATFORM"));
    }

    #[test]
    fn dollar_escapes_and_stray_dollars() {
        let out = render("cost $$5, $ alone, ${not closed, $1, ${VERSION", &vars());
        assert_eq!(out.text, "cost $5, $ alone, ${not closed, $1, ${VERSION");
        assert!(out.is_complete());
    }

    #[test]
    fn identifiers_are_greedy() {
        let out = render("$VERSIONS $VERSION_2 $VERSION.tar", &vars());
        assert_eq!(out.text, "$VERSIONS $VERSION_2 v5-05-Rev-01.tar");
        assert_eq!(out.unresolved, vec!["VERSIONS", "VERSION_2"]);
    }

    #[test]
    fn module_file_keeps_tcl_references() {
        let mut vars = vars();
        vars.set(MODULEFILE_DEPS, "ROOT/v5-34-08 GEANT3/v1-15a");
        let out = render(MODULE_FILE_TEMPLATE, &vars);

        assert!(out.text.contains("set version v5-05-Rev-01\n"));
        assert!(out
            .text
            .contains("module load BASE/1.0 ROOT/v5-34-08 GEANT3/v1-15a\n"));
        assert!(out.text.contains("setenv ALIROOT_VERSION $version\n"));
        assert!(out
            .text
            .contains("prepend-path PATH $::env(ALICE_ROOT)/bin/tgt_$::env(ALICE_TARGET_EXT)"));
        assert_eq!(out.unresolved, vec!["version"]);
    }

    #[test]
    fn optional_values_are_skipped() {
        let mut vars = Vars::new();
        vars.set_opt(PLATFORM, None).set_opt(ARCH, Some("x86_64"));
        assert_eq!(vars.get(PLATFORM), None);
        assert_eq!(vars.get(ARCH), Some("x86_64"));
    }

    proptest! {
        #[test]
        fn text_without_dollars_is_unchanged(s in "[^$]{0,64}") {
            let out = render(&s, &vars());
            prop_assert_eq!(out.text, s);
            prop_assert!(out.unresolved.is_empty());
        }

        #[test]
        fn empty_vars_round_trip_placeholders(name in "[A-Z_][A-Z0-9_]{0,10}") {
            let template = format!("a ${name} b ${{{name}}} c");
            let out = render(&template, &Vars::new());
            prop_assert_eq!(out.text, template);
            prop_assert_eq!(out.unresolved, vec![name]);
        }
    }
}
