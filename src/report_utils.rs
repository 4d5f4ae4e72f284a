pub mod csv_writer;
pub mod report_helper;

/// Column titles of the report, in output order.
pub(crate) const REPORT_HEADER: [&str; 8] = [
    "Full Name",         // e.g. org/repo-name
    "Name",              // e.g. repo-name
    "Short Description", // description trimmed down to 45 characters
    "Private",           // true or false
    "Fork",              // true or false
    "Visibility",        // public, private or internal
    "Last Update",       // e.g. 2022-06-13T07:59:05Z
    "Repo Admins",       // every admin with their name and email
];

/// One report row, already formatted for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReportRecord {
    pub(crate) full_name: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) private: bool,
    pub(crate) fork: bool,
    pub(crate) visibility: String,
    pub(crate) last_update: String,
    pub(crate) admins: String,
}

impl ReportRecord {
    pub(crate) fn cells(&self) -> [String; 8] {
        [
            self.full_name.clone(),
            self.name.clone(),
            self.description.clone(),
            self.private.to_string(),
            self.fork.to_string(),
            self.visibility.clone(),
            self.last_update.clone(),
            self.admins.clone(),
        ]
    }
}
