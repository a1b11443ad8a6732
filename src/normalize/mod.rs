//! Pure field normalizers applied to scraped text before matching.

pub mod date;
pub mod name;
pub mod text;

pub use date::coerce_date;
pub use name::{split_person_name, NameStyle, PersonName};
pub use text::{clean_str, fold_to_ascii};

/// `destination_state` sentinel for travel outside the US. Domestic
/// destinations always carry a state abbreviation after a comma.
pub const FOREIGN_STATE: &str = "FX";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    pub city: String,
    pub state: String,
}

/// Split `"City, ST"`. Without a comma the whole string is the city and the
/// state is [`FOREIGN_STATE`].
pub fn split_destination(raw: &str) -> Destination {
    match raw.split_once(',') {
        Some((city, state)) => Destination {
            city: city.trim().to_string(),
            state: state.trim().to_string(),
        },
        None => Destination {
            city: raw.trim().to_string(),
            state: FOREIGN_STATE.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domestic_destination() {
        let d = split_destination("Austin, TX");
        assert_eq!(d.city, "Austin");
        assert_eq!(d.state, "TX");
    }

    #[test]
    fn foreign_destination() {
        let d = split_destination("Paris");
        assert_eq!(d.city, "Paris");
        assert_eq!(d.state, "FX");
    }

    #[test]
    fn only_first_comma_splits() {
        let d = split_destination(" Washington, DC, USA ");
        assert_eq!(d.city, "Washington");
        assert_eq!(d.state, "DC, USA");
    }
}
