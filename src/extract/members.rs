// src/extract/members.rs

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::model::{Link, MemberListing, MemberProfile, COMMITTEE_SLOTS};
use crate::normalize::fold_to_ascii;

/// Directory entries shown per listing page.
const PAGE_SIZE: usize = 20;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("CSS selector should be valid")
}

static MEMBER_ITEM: Lazy<Selector> = Lazy::new(|| selector("#members > li"));
static MEMBER_LINK: Lazy<Selector> = Lazy::new(|| selector("a.library-link.members-link"));
static MEMBER_NAME: Lazy<Selector> = Lazy::new(|| selector("h2.member-name"));
static STATE: Lazy<Selector> = Lazy::new(|| selector(".state"));
static DISTRICT: Lazy<Selector> = Lazy::new(|| selector(".district"));
static HOMETOWN: Lazy<Selector> = Lazy::new(|| selector(".hometown"));
static PARTY: Lazy<Selector> = Lazy::new(|| selector(".party"));

static PAGE_LINK: Lazy<Selector> = Lazy::new(|| selector("ul.bottompagination a.page"));
static PAGE_INFO: Lazy<Selector> = Lazy::new(|| selector(".pagination_info"));
static OF_TOTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"of\s+([\d,]+)").expect("valid regex"));

static ABOUT_BIO: Lazy<Selector> = Lazy::new(|| selector(".about_bio"));
static H1: Lazy<Selector> = Lazy::new(|| selector(".library-h1"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static OFFICE: Lazy<Selector> = Lazy::new(|| {
    selector(r#"span[aria-label*="Rayburn"], span[aria-label*="Longworth"], span[aria-label*="Cannon"]"#)
});
static PHONE: Lazy<Selector> = Lazy::new(|| selector(r#"span[aria-label*="phone"], span[class*="phone"]"#));
static WEBSITE: Lazy<Selector> = Lazy::new(|| selector(r#"span[class*="phone"] a[href]"#));
static HEADSHOT: Lazy<Selector> = Lazy::new(|| selector("figure.about_bio-img img[src]"));
static COMMITTEE: Lazy<Selector> = Lazy::new(|| selector("a.library-committeePanel-subItems"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| selector("a"));

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(scope: ElementRef<'_>, sel: &Selector) -> String {
    scope.select(sel).next().map(text_of).unwrap_or_default()
}

fn absolute(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Entries of one directory listing page. Items without a profile link are
/// skipped.
pub fn parse_listing_page(html: &str, base: &Url, date_scraped: &str) -> Vec<MemberListing> {
    let doc = Html::parse_document(html);
    doc.select(&MEMBER_ITEM)
        .filter_map(|item| {
            let href = item.select(&MEMBER_LINK).next()?.value().attr("href")?;
            let profile_url = absolute(base, href);
            let member_id = profile_url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
            let raw_name = first_text(item, &MEMBER_NAME);
            Some(MemberListing {
                member_id,
                profile_url,
                name: fold_to_ascii(&raw_name),
                raw_name,
                state: fold_to_ascii(&first_text(item, &STATE)),
                district: fold_to_ascii(&first_text(item, &DISTRICT)),
                hometown: fold_to_ascii(&first_text(item, &HOMETOWN)),
                party: fold_to_ascii(&first_text(item, &PARTY)),
                date_scraped: date_scraped.to_string(),
            })
        })
        .collect()
}

/// Number of directory pages advertised by a listing page.
pub fn total_pages(html: &str) -> usize {
    let doc = Html::parse_document(html);

    let highest = doc
        .select(&PAGE_LINK)
        .filter_map(|a| text_of(a).parse::<usize>().ok())
        .max();
    if let Some(n) = highest {
        return n.max(1);
    }

    doc.select(&PAGE_INFO)
        .next()
        .and_then(|info| {
            let text = text_of(info);
            let caps = OF_TOTAL.captures(&text)?;
            caps[1].replace(',', "").parse::<usize>().ok()
        })
        .map(|items| items.div_ceil(PAGE_SIZE).max(1))
        .unwrap_or(1)
}

/// Fields read off a member profile page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfilePage {
    pub full_name: String,
    pub hometown: String,
    pub contact: String,
    pub phone: String,
    pub website: String,
    /// Absolute headshot image URL.
    pub headshot_url: Option<String>,
    pub committees: Vec<Link>,
    pub subcommittees: Vec<Link>,
}

impl ProfilePage {
    /// Combine with the directory entry it was reached from. State and
    /// district come from the directory; the headshot is named after the
    /// Clerk's member id.
    pub fn into_profile(
        self,
        listing: &MemberListing,
        internal_unique_id: i64,
        date_scraped: NaiveDate,
    ) -> MemberProfile {
        let member_full_name = if self.full_name.is_empty() {
            listing.name.clone()
        } else {
            self.full_name
        };
        let (headshot_filename, headshot_url) = match self.headshot_url {
            Some(url) => (format!("{}.jpg", listing.member_id), url),
            None => (String::new(), String::new()),
        };
        MemberProfile {
            internal_unique_id,
            member_full_name,
            member_state: listing.state.clone(),
            member_district: listing.district.clone(),
            member_hometown: self.hometown,
            member_contact: self.contact,
            member_phone: self.phone,
            member_website: self.website,
            member_email: String::new(),
            headshot_filename,
            headshot_url,
            committees: self.committees,
            subcommittees: self.subcommittees,
            date_scraped,
        }
    }
}

fn links_in(scope: ElementRef<'_>, base: &Url) -> Vec<Link> {
    scope
        .select(&ANCHOR)
        .take(COMMITTEE_SLOTS)
        .map(|a| Link {
            name: text_of(a),
            url: a.value().attr("href").map(|h| absolute(base, h)).unwrap_or_default(),
        })
        .collect()
}

fn inside_list(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "ul")
}

/// `None` when the page has no bio section, i.e. it did not load properly.
pub fn parse_profile_page(html: &str, base: &Url) -> Option<ProfilePage> {
    let doc = Html::parse_document(html);
    doc.select(&ABOUT_BIO).next()?;
    let root = doc.root_element();

    let hometown = doc
        .select(&PARAGRAPH)
        .map(text_of)
        .find(|t| t.contains("Hometown:"))
        .map(|t| t.replace("Hometown:", "").trim().to_string())
        .unwrap_or_default();

    let phone = first_text(root, &PHONE);
    let phone = phone.replace("Phone:", "").trim().to_string();

    let website = doc
        .select(&WEBSITE)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|h| absolute(base, h))
        .unwrap_or_default();

    let headshot_url = doc
        .select(&HEADSHOT)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| absolute(base, src));

    let top_level: Vec<ElementRef<'_>> = doc
        .select(&COMMITTEE)
        .filter(|a| !inside_list(*a))
        .take(COMMITTEE_SLOTS)
        .collect();

    let committees = top_level
        .iter()
        .map(|a| Link {
            name: text_of(*a),
            url: a.value().attr("href").map(|h| absolute(base, h)).unwrap_or_default(),
        })
        .collect();

    // a later committee's sub-list replaces an earlier one
    let subcommittees = top_level
        .iter()
        .filter_map(|a| {
            a.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|s| s.value().name() == "ul")
        })
        .last()
        .map(|ul| links_in(ul, base))
        .unwrap_or_default();

    Some(ProfilePage {
        full_name: first_text(root, &H1),
        hometown,
        contact: first_text(root, &OFFICE),
        phone,
        website,
        headshot_url,
        committees,
        subcommittees,
    })
}
