use crate::cookies::CookieStore;
use crate::dom::NodeId;
use crate::harness::Harness;
use crate::Result;

// Index of the candidate to mark, given each candidate's cookievalue
// attribute and the current cookie value. Missing attributes never
// match, including against the empty "nothing stored" value; ties go
// to the first candidate in document order so at most one element
// carries the marker afterwards.
pub(crate) fn selection_target(candidates: &[Option<String>], current: &str) -> Option<usize> {
    candidates
        .iter()
        .position(|value| value.as_deref() == Some(current))
}

impl Harness {
    pub fn highlight_option(&mut self, cookie_name: &str) -> Result<()> {
        let marker = self.config.marker_class.clone();
        let candidates = self.option_elements(cookie_name);
        for candidate in &candidates {
            self.dom.class_remove(*candidate, &marker)?;
        }

        let current = self.cookies.get(cookie_name);
        let values = candidates
            .iter()
            .map(|candidate| self.dom.attr(*candidate, "cookievalue"))
            .collect::<Vec<_>>();
        if let Some(index) = selection_target(&values, &current) {
            self.dom.class_add(candidates[index], &marker)?;
        }
        Ok(())
    }

    pub fn highlight_options(&mut self, cookie_names: &[&str]) -> Result<()> {
        for cookie_name in cookie_names {
            self.highlight_option(cookie_name)?;
        }
        Ok(())
    }

    // Selection couples the cookie write to an immediate re-highlight
    // of that single option, the way the page's click handler does.
    pub fn select_option(&mut self, cookie_name: &str, cookie_value: &str) -> Result<()> {
        self.cookies.set(cookie_name, cookie_value);
        self.highlight_option(cookie_name)
    }

    pub fn marked_option(&self, cookie_name: &str) -> Result<Option<String>> {
        for candidate in self.option_elements(cookie_name) {
            if self.dom.class_contains(candidate, &self.config.marker_class)? {
                return Ok(self.dom.attr(candidate, "cookievalue"));
            }
        }
        Ok(None)
    }

    fn option_elements(&self, cookie_name: &str) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.dom.collect_elements_dfs(self.dom.root, &mut ids);
        ids.retain(|id| self.dom.attr(*id, "cookiename").as_deref() == Some(cookie_name));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_candidate_wins() {
        let candidates = vec![
            Some("EXACT".to_string()),
            Some("TRUNCATED".to_string()),
            Some("TRUNCATED".to_string()),
        ];
        assert_eq!(selection_target(&candidates, "TRUNCATED"), Some(1));
    }

    #[test]
    fn no_match_selects_nothing() {
        let candidates = vec![Some("EXACT".to_string()), Some("COMPONENTS".to_string())];
        assert_eq!(selection_target(&candidates, "TRUNCATED"), None);
        assert_eq!(selection_target(&[], "TRUNCATED"), None);
    }

    #[test]
    fn missing_attribute_never_matches_the_empty_value() {
        let candidates = vec![None, Some(String::new())];
        assert_eq!(selection_target(&candidates, ""), Some(1));
    }
}
