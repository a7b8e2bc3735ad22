use pagemeta_web::looks_like_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty query or `help`.
    Help,
    /// Anything shaped like a web address, verbatim.
    Lookup(String),
    Invalid(String),
}

impl Command {
    /// Route a raw launcher query. The query is taken verbatim; `help` is
    /// case-sensitive and surrounding whitespace makes an address invalid.
    pub fn parse(input: &str) -> Command {
        match input {
            "" | "help" => Command::Help,
            q if looks_like_url(q) => Command::Lookup(q.to_string()),
            other => Command::Invalid(other.to_string()),
        }
    }
}
