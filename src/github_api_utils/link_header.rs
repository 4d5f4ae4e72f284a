use thiserror::Error;
use url::Url;

/// Pagination decision taken from one response's `link` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PageCursor {
    pub(crate) has_more: bool,
    pub(crate) next_page: u32,
    pub(crate) last_page: u32,
}

impl PageCursor {
    pub(crate) const DONE: PageCursor = PageCursor {
        has_more: false,
        next_page: 0,
        last_page: 0,
    };

    /// Page to request after `current_page`, or `None` once the walk is over.
    pub(crate) fn next_request(&self, current_page: u32) -> Result<Option<u32>, LinkHeaderError> {
        if !self.has_more || self.next_page > self.last_page {
            return Ok(None);
        }
        if self.next_page <= current_page {
            return Err(LinkHeaderError::NotAdvancing {
                current: current_page,
                next: self.next_page,
            });
        }
        Ok(Some(self.next_page))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum LinkHeaderError {
    #[error("link header has a next relation but no last relation")]
    MissingLast,
    #[error("last relation is not wrapped in angle brackets")]
    MissingUrl,
    #[error("unable to parse URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("page query parameter missing from '{0}'")]
    MissingPage(String),
    #[error("multiple values for page query parameter in '{0}'")]
    DuplicatePage(String),
    #[error("unable to convert page query parameter '{0}' to an integer")]
    InvalidPage(String),
    #[error("next page {next} does not advance past page {current}")]
    NotAdvancing { current: u32, next: u32 },
}

/// One `<url>; rel="..."` entry of a link header.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LinkEntry<'a> {
    pub(crate) relations: Vec<&'a str>,
    pub(crate) target: Option<&'a str>,
}

impl LinkEntry<'_> {
    fn has_relation(&self, relation: &str) -> bool {
        self.relations.iter().any(|rel| *rel == relation)
    }
}

/// Splits a link header into its entries, keeping their order.
/// Example header:
/// `<https://api.github.com/organizations/123/repos?page=2>; rel="next", <https://api.github.com/organizations/123/repos?page=4>; rel="last"`
pub(crate) fn parse_link_header(header: &str) -> Vec<LinkEntry<'_>> {
    header
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_link_entry)
        .collect()
}

fn parse_link_entry(entry: &str) -> LinkEntry<'_> {
    let (target, params) = entry.split_once(';').unwrap_or((entry, ""));
    let target = target
        .trim()
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .map(str::trim);
    let relations = params
        .split(';')
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("rel")
                .then(|| value.trim().trim_matches('"'))
        })
        .flat_map(str::split_whitespace)
        .collect();
    LinkEntry { relations, target }
}

/// Turns a raw link header into a [`PageCursor`].
///
/// An unusable `next` relation ends the walk quietly, while an unusable (or
/// absent) `last` relation is an error.
pub(crate) fn resolve_cursor(header: &str) -> Result<PageCursor, LinkHeaderError> {
    if header.trim().is_empty() {
        return Ok(PageCursor::DONE);
    }
    let entries = parse_link_header(header);

    let Some(next) = entries.iter().find(|entry| entry.has_relation("next")) else {
        return Ok(PageCursor::DONE);
    };
    let next_page = match page_of(next) {
        Ok(page) => page,
        Err(err) => {
            debug!("Ignoring unusable next relation: {err}");
            return Ok(PageCursor::DONE);
        }
    };

    let last = entries
        .iter()
        .find(|entry| entry.has_relation("last"))
        .ok_or(LinkHeaderError::MissingLast)?;
    let last_page = page_of(last)?;

    Ok(PageCursor {
        has_more: true,
        next_page,
        last_page,
    })
}

fn page_of(entry: &LinkEntry<'_>) -> Result<u32, LinkHeaderError> {
    let raw = entry.target.ok_or(LinkHeaderError::MissingUrl)?;
    let url = Url::parse(raw).map_err(|source| LinkHeaderError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })?;

    let pages: Vec<String> = url
        .query_pairs()
        .filter(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())
        .collect();
    match pages.as_slice() {
        [] => Err(LinkHeaderError::MissingPage(raw.to_owned())),
        [page] => page
            .parse::<u32>()
            .map_err(|_| LinkHeaderError::InvalidPage(page.clone())),
        _ => Err(LinkHeaderError::DuplicatePage(raw.to_owned())),
    }
}
