//! Static country list and prefix search for the profile form.

use serde::{Deserialize, Serialize};

pub const COUNTRIES: [&str; 196] = [
    "Afghanistan", "Albania", "Algeria", "Andorra", "Angola", "Argentina", "Armenia",
    "Australia", "Austria", "Azerbaijan", "Bahamas", "Bahrain", "Bangladesh", "Barbados",
    "Belarus", "Belgium", "Belize", "Benin", "Bhutan", "Bolivia", "Bosnia and Herzegovina",
    "Botswana", "Brazil", "Brunei", "Bulgaria", "Burkina Faso", "Burundi", "Cambodia",
    "Cameroon", "Canada", "Cape Verde", "Central African Republic", "Chad", "Chile", "China",
    "Colombia", "Comoros", "Congo", "Costa Rica", "Croatia", "Cuba", "Cyprus", "Czech Republic",
    "Czechia", "Denmark", "Djibouti", "Dominica", "Dominican Republic", "East Timor", "Ecuador",
    "Egypt", "El Salvador", "Equatorial Guinea", "Eritrea", "Estonia", "Ethiopia", "Fiji",
    "Finland", "France", "Gabon", "Gambia", "Georgia", "Germany", "Ghana", "Greece", "Grenada",
    "Guatemala", "Guinea", "Guinea-Bissau", "Guyana", "Haiti", "Honduras", "Hungary", "Iceland",
    "India", "Indonesia", "Iran", "Iraq", "Ireland", "Israel", "Italy", "Jamaica", "Japan",
    "Jordan", "Kazakhstan", "Kenya", "Kiribati", "Korea", "Kosovo", "Kuwait", "Kyrgyzstan",
    "Laos", "Latvia", "Lebanon", "Lesotho", "Liberia", "Libya", "Liechtenstein", "Lithuania",
    "Luxembourg", "Madagascar", "Malawi", "Malaysia", "Maldives", "Mali", "Malta",
    "Marshall Islands", "Mauritania", "Mauritius", "Mexico", "Micronesia", "Moldova", "Monaco",
    "Mongolia", "Montenegro", "Morocco", "Mozambique", "Myanmar", "Namibia", "Nauru", "Nepal",
    "Netherlands", "New Zealand", "Nicaragua", "Niger", "Nigeria", "North Korea",
    "North Macedonia", "Norway", "Oman", "Pakistan", "Palau", "Palestine", "Panama",
    "Papua New Guinea", "Paraguay", "Peru", "Philippines", "Poland", "Portugal", "Qatar",
    "Romania", "Russia", "Rwanda", "Saint Kitts and Nevis", "Saint Lucia",
    "Saint Vincent and the Grenadines", "Samoa", "San Marino", "Sao Tome and Principe",
    "Saudi Arabia", "Senegal", "Serbia", "Seychelles", "Sierra Leone", "Singapore", "Slovakia",
    "Slovenia", "Solomon Islands", "Somalia", "South Africa", "South Korea", "South Sudan",
    "Spain", "Sri Lanka", "Sudan", "Suriname", "Sweden", "Switzerland", "Syria", "Taiwan",
    "Tajikistan", "Tanzania", "Thailand", "Timor-Leste", "Togo", "Tonga", "Trinidad and Tobago",
    "Tunisia", "Turkey", "Turkmenistan", "Tuvalu", "Uganda", "Ukraine", "United Arab Emirates",
    "United Kingdom", "United States", "Uruguay", "Uzbekistan", "Vanuatu", "Vatican City",
    "Venezuela", "Vietnam", "Yemen", "Zambia", "Zimbabwe",
];

/// Case-insensitive prefix search over a fixed, ordered list of names.
#[derive(Debug, Clone, Copy)]
pub struct CountryIndex {
    names: &'static [&'static str],
}

impl Default for CountryIndex {
    fn default() -> Self {
        Self::new(&COUNTRIES)
    }
}

impl CountryIndex {
    #[must_use]
    pub const fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    /// Names starting with `query`, in list order. A blank query matches
    /// nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<String> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let needle = query.to_lowercase();
        self.names
            .iter()
            .filter(|name| name.to_lowercase().starts_with(&needle))
            .map(|name| (*name).to_string())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name)
    }
}

/// Free-text country input with its suggestion dropdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryField {
    value: String,
    suggestions: Vec<String>,
    open: bool,
}

impl CountryField {
    #[must_use]
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            suggestions: Vec::new(),
            open: false,
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn input(&mut self, value: impl Into<String>, index: &CountryIndex) {
        self.value = value.into();
        self.refresh(index);
    }

    /// Focusing a field that already holds text reopens the last list it
    /// showed. A selection empties that list, so it stays closed.
    pub fn focus(&mut self) {
        if !self.value.is_empty() && !self.suggestions.is_empty() {
            self.open = true;
        }
    }

    pub fn select(&mut self, name: impl Into<String>) {
        self.value = name.into();
        self.suggestions.clear();
        self.open = false;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    fn refresh(&mut self, index: &CountryIndex) {
        self.suggestions = index.search(&self.value);
        self.open = !self.suggestions.is_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_search_keeps_list_order() {
        let index = CountryIndex::default();
        assert_eq!(index.search("Ge"), vec!["Georgia", "Germany"]);
        assert_eq!(index.search("Ger"), vec!["Germany"]);
        assert_eq!(index.search("gER"), vec!["Germany"]);
        assert_eq!(
            index.search("sa"),
            vec![
                "Saint Kitts and Nevis",
                "Saint Lucia",
                "Saint Vincent and the Grenadines",
                "Samoa",
                "San Marino",
                "Sao Tome and Principe",
                "Saudi Arabia",
            ]
        );
    }

    #[test]
    fn blank_or_unknown_queries_match_nothing() {
        let index = CountryIndex::default();
        assert!(index.search("").is_empty());
        assert!(index.search("   ").is_empty());
        assert!(index.search("xyz").is_empty());
    }

    #[test]
    fn search_is_not_trimmed_after_the_blank_check() {
        let index = CountryIndex::default();
        assert!(index.search(" Ger").is_empty());
    }

    #[test]
    fn field_opens_only_with_matches() {
        let index = CountryIndex::default();
        let mut field = CountryField::default();

        field.input("Ca", &index);
        assert!(field.is_open());
        assert_eq!(field.suggestions(), ["Cambodia", "Cameroon", "Canada", "Cape Verde"]);

        field.input("Cx", &index);
        assert!(!field.is_open());
        assert!(field.suggestions().is_empty());
    }

    #[test]
    fn selecting_replaces_value_and_closes() {
        let index = CountryIndex::default();
        let mut field = CountryField::default();
        field.input("Nor", &index);
        field.select("Norway");

        assert_eq!(field.value(), "Norway");
        assert!(!field.is_open());
        assert!(field.suggestions().is_empty());

        field.focus();
        assert!(!field.is_open());
    }

    #[test]
    fn focus_reopens_the_last_typed_list() {
        let index = CountryIndex::default();
        let mut field = CountryField::default();
        field.input("Ge", &index);
        field.close();

        field.focus();
        assert!(field.is_open());
        assert_eq!(field.suggestions(), ["Georgia", "Germany"]);

        let mut empty = CountryField::default();
        empty.focus();
        assert!(!empty.is_open());
    }

    #[test]
    fn list_has_no_duplicates() {
        let mut names = COUNTRIES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COUNTRIES.len());
    }
}
