//! Class lists
//!
//! The `class` attribute as an ordered set of tokens. Rewriting one
//! token keeps it at its position, so modifier classes stay where the
//! markup put them.

use std::fmt;

/// Ordered, duplicate-free class tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList {
    tokens: Vec<String>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a `class` attribute value; repeated tokens collapse
    pub fn parse(attr: &str) -> Self {
        attr.split_ascii_whitespace().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.tokens.iter().any(|t| t == class)
    }

    /// Append `class`; `false` if it was already there or empty
    pub fn insert(&mut self, class: &str) -> bool {
        if class.is_empty() || self.contains(class) {
            return false;
        }
        self.tokens.push(class.to_string());
        true
    }

    /// `false` if `class` was not there
    pub fn remove(&mut self, class: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != class);
        self.tokens.len() != before
    }

    /// Flip `class`, or force it on or off; returns whether it is present
    /// afterwards
    pub fn toggle(&mut self, class: &str, force: Option<bool>) -> bool {
        let on = force.unwrap_or(!self.contains(class));
        if on {
            self.insert(class);
        } else {
            self.remove(class);
        }
        on
    }

    /// Swap `old` for `new` at the same position. An empty `new`, or one
    /// already in the list, only drops `old`.
    pub fn replace(&mut self, old: &str, new: &str) -> bool {
        let Some(pos) = self.tokens.iter().position(|t| t == old) else {
            return false;
        };
        if new.is_empty() || self.contains(new) {
            self.tokens.remove(pos);
        } else {
            self.tokens[pos] = new.to_string();
        }
        true
    }

    /// Drop every token matching `pred`, returning how many went
    pub fn remove_where(&mut self, mut pred: impl FnMut(&str) -> bool) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|t| !pred(t));
        before - self.tokens.len()
    }

    pub fn find(&self, pred: impl Fn(&str) -> bool) -> Option<&str> {
        self.iter().find(|t| pred(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for ClassList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = ClassList::new();
        for class in iter {
            list.insert(class);
        }
        list
    }
}

/// The attribute value: tokens joined by single spaces
impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collapses_repeats() {
        let list = ClassList::parse("button  button_size_m i-bem button");
        assert_eq!(list.len(), 3);
        assert!(list.contains("i-bem"));
        assert_eq!(list.to_string(), "button button_size_m i-bem");
    }

    #[test]
    fn test_insert_and_remove() {
        let mut list = ClassList::new();
        assert!(list.insert("menu"));
        assert!(!list.insert("menu"));
        assert!(!list.insert(""));
        assert!(list.remove("menu"));
        assert!(!list.remove("menu"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_toggle() {
        let mut list = ClassList::new();
        assert!(list.toggle("active", None));
        assert!(!list.toggle("active", None));
        assert!(list.toggle("x", Some(true)));
        assert!(list.toggle("x", Some(true)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut list = ClassList::parse("b b_theme_light i-bem");
        assert!(list.replace("b_theme_light", "b_theme_dark"));
        assert_eq!(list.to_string(), "b b_theme_dark i-bem");

        assert!(list.replace("b_theme_dark", "i-bem"));
        assert_eq!(list.to_string(), "b i-bem");
        assert!(!list.replace("missing", "x"));
    }

    #[test]
    fn test_remove_where() {
        let mut list = ClassList::parse("tabs tabs_size_m tabs_size_l i-bem");
        assert_eq!(list.remove_where(|t| t.starts_with("tabs_size_")), 2);
        assert_eq!(list.find(|t| t.starts_with("tabs")), Some("tabs"));
    }
}
