// src/model.rs

use chrono::NaiveDate;
use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::normalize::{
    clean_str, coerce_date, fold_to_ascii, split_destination, split_person_name, NameStyle,
};

/// Placeholder written for absent text, and treated as "no value" when read back.
pub const INVALID_MARKER: &str = "badvalue";

/// State/district value for filers with no congressional seat.
pub const ADMIN_SEAT: &str = "ADMIN";

/// `surrogate_member_id` for a current-year filing whose member is not in the roster.
pub const UNKNOWN_MEMBER_ID: i64 = 0;

/// One `<Travel>` element as scraped: flat tag → text, tagged with the archive year.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawFiling {
    pub year: String,
    pub fields: BTreeMap<String, String>,
}

impl RawFiling {
    pub fn new(year: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Cleaned value of `tag`, `None` if absent or blank.
    pub fn get(&self, tag: &str) -> Option<String> {
        self.fields
            .get(tag)
            .map(|v| clean_str(v))
            .filter(|v| !v.is_empty())
    }
}

/// One gift/travel disclosure, normalized. Serialized names follow the
/// `house_travel_reports` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    #[serde(rename = "docid")]
    pub doc_id: Option<String>,
    pub report_year: Option<String>,
    pub filer_full_name: Option<String>,
    pub filer_first_name: Option<String>,
    pub filer_last_name: Option<String>,
    pub member_full_name: Option<String>,
    pub member_first_name: Option<String>,
    pub member_last_name: Option<String>,
    pub member_state: String,
    pub member_district: String,
    #[serde(rename = "filingtype")]
    pub filing_type: Option<String>,
    pub destination_city: Option<String>,
    pub destination_state: Option<String>,
    #[serde(rename = "departuredate")]
    pub departure_date: Option<NaiveDate>,
    #[serde(rename = "returndate")]
    pub return_date: Option<NaiveDate>,
    pub travel_sponsor: Option<String>,
    pub date_scraped: NaiveDate,
    #[serde(rename = "internal_unique_id")]
    pub surrogate_member_id: Option<i64>,
    #[serde(rename = "staff_id")]
    pub filer_staff_id: Option<String>,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl FilingRecord {
    /// Build a normalized record from one scraped element.
    ///
    /// `FilerName` is "First Last", `MemberName` is "Last, First". A `Year`
    /// tag overrides the archive year. Filings with no `State`/`District`
    /// come from administrative filers and get [`ADMIN_SEAT`].
    pub fn from_raw(raw: &RawFiling, date_scraped: NaiveDate) -> Self {
        let filer_full_name = raw.get("FilerName").map(|n| fold_to_ascii(&n));
        let filer = filer_full_name
            .as_deref()
            .map(|n| split_person_name(n, NameStyle::FirstLast))
            .unwrap_or_default();

        let member = raw
            .get("MemberName")
            .map(|n| split_person_name(&fold_to_ascii(&n), NameStyle::LastCommaFirst));

        let destination = raw.get("Destination").map(|d| split_destination(&d));

        let report_year = raw
            .get("Year")
            .or_else(|| non_empty(raw.year.trim().to_string()));

        Self {
            doc_id: raw.get("DocID"),
            report_year,
            filer_full_name: filer_full_name.and_then(non_empty),
            filer_first_name: non_empty(filer.first),
            filer_last_name: non_empty(filer.last),
            member_full_name: member.as_ref().and_then(|m| non_empty(m.full_name())),
            member_first_name: member.as_ref().and_then(|m| non_empty(m.first.clone())),
            member_last_name: member.as_ref().and_then(|m| non_empty(m.last.clone())),
            member_state: raw.get("State").unwrap_or_else(|| ADMIN_SEAT.to_string()),
            member_district: raw
                .get("District")
                .unwrap_or_else(|| ADMIN_SEAT.to_string()),
            filing_type: raw.get("FilingType"),
            destination_city: destination.as_ref().and_then(|d| non_empty(d.city.clone())),
            destination_state: destination.map(|d| d.state),
            departure_date: raw.get("DepartureDate").and_then(|d| coerce_date(&d)),
            return_date: raw.get("ReturnDate").and_then(|d| coerce_date(&d)),
            travel_sponsor: raw.get("TravelSponsor"),
            date_scraped,
            surrogate_member_id: None,
            filer_staff_id: None,
        }
    }

    /// Report year as a number, if it parses.
    pub fn year(&self) -> Option<i32> {
        self.report_year.as_deref()?.trim().parse().ok()
    }
}

/// One known legislator. `full_name` is "First Last".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRosterEntry {
    #[serde(rename = "member_full_name")]
    pub full_name: String,
    #[serde(rename = "internal_unique_id")]
    pub surrogate_member_id: i64,
    #[serde(rename = "member_state", default, deserialize_with = "null_as_empty")]
    pub state: String,
    #[serde(rename = "member_district", default, deserialize_with = "null_as_empty")]
    pub district: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// A filer who is not the member named on the filing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffEntry {
    #[serde(rename = "staff_id")]
    pub surrogate_staff_id: String,
    pub staff_full_name: String,
    pub associated_member_id: Option<i64>,
}

/// One entry of the Clerk's member directory, as written to `member_links.csv`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberListing {
    pub member_id: String,
    pub profile_url: String,
    /// ASCII-folded display name, "Last, First".
    pub name: String,
    pub raw_name: String,
    pub state: String,
    pub district: String,
    pub hometown: String,
    pub party: String,
    pub date_scraped: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    pub url: String,
}

/// A member profile page, resolved to the roster's surrogate id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberProfile {
    pub internal_unique_id: i64,
    pub member_full_name: String,
    pub member_state: String,
    pub member_district: String,
    pub member_hometown: String,
    pub member_contact: String,
    pub member_phone: String,
    pub member_website: String,
    pub member_email: String,
    pub headshot_filename: String,
    pub headshot_url: String,
    pub committees: Vec<Link>,
    pub subcommittees: Vec<Link>,
    pub date_scraped: NaiveDate,
}

/// Committee slots in the `member_details` table.
pub const COMMITTEE_SLOTS: usize = 4;

impl Serialize for MemberProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("internal_unique_id", &self.internal_unique_id)?;
        map.serialize_entry("member_full_name", &self.member_full_name)?;
        map.serialize_entry("member_state", &self.member_state)?;
        map.serialize_entry("member_district", &self.member_district)?;
        map.serialize_entry("member_hometown", &self.member_hometown)?;
        map.serialize_entry("member_contact", &self.member_contact)?;
        map.serialize_entry("member_phone", &self.member_phone)?;
        map.serialize_entry("member_website", &self.member_website)?;
        map.serialize_entry("member_email", &self.member_email)?;
        map.serialize_entry("headshot_filename", &self.headshot_filename)?;
        map.serialize_entry("headshot_url", &self.headshot_url)?;

        for (prefix, links) in [("c", &self.committees), ("sc", &self.subcommittees)] {
            for i in 0..COMMITTEE_SLOTS {
                let link = links.get(i);
                map.serialize_entry(
                    &format!("{}_{}", prefix, i + 1),
                    link.map(|l| l.name.as_str()).unwrap_or(""),
                )?;
                map.serialize_entry(
                    &format!("{}_{}link", prefix, i + 1),
                    link.map(|l| l.url.as_str()).unwrap_or(""),
                )?;
            }
        }

        map.serialize_entry("date_scraped", &self.date_scraped)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(year: &str, pairs: &[(&str, &str)]) -> RawFiling {
        let mut r = RawFiling::new(year);
        for (k, v) in pairs {
            r.fields.insert(k.to_string(), v.to_string());
        }
        r
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 5).unwrap()
    }

    #[test]
    fn builds_member_filing() {
        let r = raw(
            "2024",
            &[
                ("DocID", "500012345"),
                ("FilerName", "Jane Doe"),
                ("MemberName", "Doe, Jane"),
                ("State", "TX"),
                ("District", "10"),
                ("Destination", "Austin, TX"),
                ("DepartureDate", "3/14/2024"),
                ("ReturnDate", "3/16/2024"),
                ("TravelSponsor", "Policy Institute"),
                ("FilingType", "Original"),
            ],
        );
        let rec = FilingRecord::from_raw(&r, today());

        assert_eq!(rec.doc_id.as_deref(), Some("500012345"));
        assert_eq!(rec.report_year.as_deref(), Some("2024"));
        assert_eq!(rec.filer_first_name.as_deref(), Some("Jane"));
        assert_eq!(rec.filer_last_name.as_deref(), Some("Doe"));
        assert_eq!(rec.member_full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(rec.member_last_name.as_deref(), Some("Doe"));
        assert_eq!(rec.destination_city.as_deref(), Some("Austin"));
        assert_eq!(rec.destination_state.as_deref(), Some("TX"));
        assert_eq!(rec.departure_date, NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(rec.member_state, "TX");
        assert_eq!(rec.surrogate_member_id, None);
    }

    #[test]
    fn admin_filer_and_foreign_trip() {
        let r = raw(
            "2025",
            &[
                ("FilerName", "Pat Clerk"),
                ("MemberName", "Velázquez, Nydia M."),
                ("Destination", "Tokyo"),
                ("DepartureDate", "sometime"),
                ("Year", "2024"),
            ],
        );
        let rec = FilingRecord::from_raw(&r, today());

        assert_eq!(rec.member_state, ADMIN_SEAT);
        assert_eq!(rec.member_district, ADMIN_SEAT);
        assert_eq!(rec.destination_state.as_deref(), Some("FX"));
        assert_eq!(rec.destination_city.as_deref(), Some("Tokyo"));
        assert_eq!(rec.member_full_name.as_deref(), Some("Nydia M. Velazquez"));
        assert_eq!(rec.report_year.as_deref(), Some("2024"));
        assert_eq!(rec.year(), Some(2024));
        assert_eq!(rec.departure_date, None);
    }

    #[test]
    fn missing_names_stay_absent() {
        let rec = FilingRecord::from_raw(&raw("2025", &[("MemberName", "   ")]), today());
        assert_eq!(rec.member_full_name, None);
        assert_eq!(rec.filer_full_name, None);
        assert_eq!(rec.filer_first_name, None);
        assert_eq!(rec.destination_state, None);
    }

    #[test]
    fn profile_serializes_committee_slots() {
        let profile = MemberProfile {
            internal_unique_id: 7,
            member_full_name: "Jane Doe".into(),
            member_state: "TX".into(),
            member_district: "10th".into(),
            member_hometown: "Austin".into(),
            member_contact: "1 Cannon HOB".into(),
            member_phone: "(202) 225-0000".into(),
            member_website: "https://doe.house.gov".into(),
            member_email: String::new(),
            headshot_filename: "D000001.jpg".into(),
            headshot_url: "https://clerk.house.gov/img/D000001.jpg".into(),
            committees: vec![Link {
                name: "Appropriations".into(),
                url: "https://clerk.house.gov/committees/AP00".into(),
            }],
            subcommittees: vec![],
            date_scraped: today(),
        };
        let v = serde_json::to_value(&profile).unwrap();
        assert_eq!(v["internal_unique_id"], 7);
        assert_eq!(v["c_1"], "Appropriations");
        assert_eq!(v["c_1link"], "https://clerk.house.gov/committees/AP00");
        assert_eq!(v["c_4"], "");
        assert_eq!(v["sc_2link"], "");
        assert_eq!(v["date_scraped"], "2025-04-05");
    }

    #[test]
    fn roster_row_with_null_seat() {
        let row = serde_json::json!({
            "member_full_name": "Jane Doe",
            "internal_unique_id": 7,
            "member_state": null,
        });
        let entry: MemberRosterEntry = serde_json::from_value(row).unwrap();
        assert_eq!(entry.surrogate_member_id, 7);
        assert_eq!(entry.state, "");
        assert_eq!(entry.district, "");
    }
}
