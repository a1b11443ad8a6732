/// How a raw person name is laid out in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameStyle {
    /// `"First Last"`, split on the first space.
    FirstLast,
    /// `"Last, First"`, split on the first comma.
    LastCommaFirst,
}

/// A name split into first/last parts. Either part may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    /// Rejoin as `"First Last"`, dropping whichever part is empty.
    pub fn full_name(&self) -> String {
        match (self.first.is_empty(), self.last.is_empty()) {
            (false, false) => format!("{} {}", self.first, self.last),
            (false, true) => self.first.clone(),
            (true, _) => self.last.clone(),
        }
    }
}

pub fn split_person_name(raw: &str, style: NameStyle) -> PersonName {
    let raw = raw.trim();
    match style {
        NameStyle::LastCommaFirst => match raw.split_once(',') {
            Some((last, first)) => PersonName {
                first: first.trim().to_string(),
                last: last.trim().to_string(),
            },
            None => PersonName {
                first: String::new(),
                last: raw.to_string(),
            },
        },
        NameStyle::FirstLast => match raw.split_once(' ') {
            Some((first, last)) => PersonName {
                first: first.to_string(),
                last: last.trim().to_string(),
            },
            None => PersonName {
                first: raw.to_string(),
                last: String::new(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_comma_first_round_trips() {
        for raw in ["Doe, Jane", "Ocasio-Cortez, Alexandria", "  Smith ,  John Q. "] {
            let name = split_person_name(raw, NameStyle::LastCommaFirst);
            let (last, first) = raw.split_once(',').unwrap();
            assert_eq!(
                name.full_name(),
                format!("{} {}", first.trim(), last.trim())
            );
        }
    }

    #[test]
    fn missing_comma_is_all_last_name() {
        let name = split_person_name("Cher", NameStyle::LastCommaFirst);
        assert_eq!(name.first, "");
        assert_eq!(name.last, "Cher");
        assert_eq!(name.full_name(), "Cher");
    }

    #[test]
    fn only_first_comma_splits() {
        let name = split_person_name("King, Jr., Martin", NameStyle::LastCommaFirst);
        assert_eq!(name.last, "King");
        assert_eq!(name.first, "Jr., Martin");
    }

    #[test]
    fn first_last_splits_on_first_space() {
        let name = split_person_name("Mary Ann Smith", NameStyle::FirstLast);
        assert_eq!(name.first, "Mary");
        assert_eq!(name.last, "Ann Smith");

        let single = split_person_name("Staffer", NameStyle::FirstLast);
        assert_eq!(single.first, "Staffer");
        assert_eq!(single.last, "");
    }

    #[test]
    fn empty_input_is_empty_name() {
        assert_eq!(
            split_person_name("", NameStyle::FirstLast),
            PersonName::default()
        );
        assert_eq!(
            split_person_name("   ", NameStyle::LastCommaFirst),
            PersonName::default()
        );
    }
}
