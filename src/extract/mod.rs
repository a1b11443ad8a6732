//! Turning downloaded documents into raw records: yearly filings archives
//! (zip of XML) and Clerk directory/profile HTML.

pub mod members;
pub mod travel;

pub use members::{parse_listing_page, parse_profile_page, total_pages, ProfilePage};
pub use travel::{parse_travel_xml, read_travel_archive, read_travel_zip};
