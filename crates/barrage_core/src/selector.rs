//! Style selectors
//!
//! A selector is built from a list of choice lists. Its names are the
//! cartesian product of the choices, each folded into the running name by
//! substituting the first `*`. Names that still contain `*` are globs over
//! registered styles.

pub const WILDCARD: char = '*';

/// Placeholder accepted anywhere a style name is optional.
pub const PLACEHOLDER: &str = "_";

/// Fold `next` into `acc` by replacing the first wildcard of `acc`.
/// Empty and placeholder strings are identities.
pub fn merge_styles(acc: &str, next: &str) -> String {
    if acc.is_empty() || acc == PLACEHOLDER {
        return next.to_string();
    }
    if next.is_empty() || next == PLACEHOLDER {
        return acc.to_string();
    }
    match acc.find(WILDCARD) {
        Some(at) => format!("{}{}{}", &acc[..at], next, &acc[at + 1..]),
        None => next.to_string(),
    }
}

/// Glob match where each `*` consumes one or more characters.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let mut states = vec![0usize];
    let mut next = Vec::new();
    for ch in name.chars() {
        next.clear();
        for &state in &states {
            match pattern.get(state) {
                Some(&WILDCARD) => {
                    next.push(state);
                    next.push(state + 1);
                }
                Some(&p) if p == ch => next.push(state + 1),
                _ => {}
            }
        }
        next.sort_unstable();
        next.dedup();
        std::mem::swap(&mut states, &mut next);
        if states.is_empty() {
            return false;
        }
    }
    states.contains(&pattern.len())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSelector {
    enumerated: Vec<String>,
    exclude: bool,
}

impl StyleSelector {
    /// Enumerate the cartesian product of `selections`.
    pub fn new<I, J, S>(selections: I, exclude: bool) -> Self
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selections: Vec<Vec<String>> = selections
            .into_iter()
            .map(|choices| choices.into_iter().map(|s| s.as_ref().to_string()).collect())
            .collect();
        let enumerated = if selections.iter().all(Vec::is_empty) {
            Vec::new()
        } else {
            selections.iter().fold(vec![String::new()], |partials, choices| {
                partials
                    .iter()
                    .flat_map(|acc| choices.iter().map(move |choice| merge_styles(acc, choice)))
                    .collect()
            })
        };
        Self {
            enumerated,
            exclude,
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self {
            enumerated: vec![name.into()],
            exclude: false,
        }
    }

    /// Same names, inverted: match every style *not* listed.
    pub fn excluding(mut self) -> Self {
        self.exclude = true;
        self
    }

    pub fn enumerated(&self) -> &[String] {
        &self.enumerated
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclude
    }

    pub fn matches(&self, style: &str) -> bool {
        let listed = self.enumerated.iter().any(|p| glob_matches(p, style));
        listed != self.exclude
    }
}

impl From<&str> for StyleSelector {
    fn from(name: &str) -> Self {
        Self::single(name)
    }
}
