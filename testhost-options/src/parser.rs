//! Tokenized command-line representation and the tokenizer producing it

/// One occurrence of an option on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionRecord {
    /// Option name without leading dashes
    pub option: String,
    /// Values following the option, in order
    pub arguments: Vec<String>,
}

impl OptionRecord {
    pub fn new<I, S>(option: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            option: option.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read-only query surface over a parsed command line
pub trait CommandLineOptions: Send + Sync {
    /// Whether the option appears at least once
    fn is_option_set(&self, name: &str) -> bool;

    /// Concatenated arguments of every occurrence of the option, `None` when
    /// the option is absent
    fn option_arguments(&self, name: &str) -> Option<Vec<String>>;
}

/// Output of the tokenizer, consumed read-only by the validator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Tool named as the first bare token, if any
    pub tool_name: Option<String>,
    /// Option records in command-line order
    pub options: Vec<OptionRecord>,
    /// Syntax errors reported by the tokenizer
    pub errors: Vec<String>,
}

impl ParseResult {
    /// Create a result without errors
    pub fn new(options: Vec<OptionRecord>) -> Self {
        Self {
            tool_name: None,
            options,
            errors: Vec::new(),
        }
    }

    /// Attach a tool name
    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    /// Attach tokenizer errors
    pub fn with_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors.extend(errors.into_iter().map(Into::into));
        self
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    /// Distinct option names in first-occurrence order
    pub fn distinct_option_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for record in &self.options {
            if !names.contains(&record.option.as_str()) {
                names.push(&record.option);
            }
        }
        names
    }

    /// Records for the given option name
    pub fn records_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a OptionRecord> {
        self.options.iter().filter(move |record| record.option == name)
    }
}

impl CommandLineOptions for ParseResult {
    fn is_option_set(&self, name: &str) -> bool {
        let name = strip_dashes(name);
        self.records_for(name).next().is_some()
    }

    fn option_arguments(&self, name: &str) -> Option<Vec<String>> {
        let name = strip_dashes(name);
        if !self.is_option_set(name) {
            return None;
        }

        Some(
            self.records_for(name)
                .flat_map(|record| record.arguments.iter().cloned())
                .collect(),
        )
    }
}

pub(crate) fn strip_dashes(name: &str) -> &str {
    name.trim().trim_start_matches('-')
}

/// Splits raw process arguments into option records.
///
/// `--name` and `-name` start an option; `--name=value` and `--name:value`
/// carry an inline first value. A bare token in first position names a tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLineParser;

impl CommandLineParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse<I, S>(&self, args: I) -> ParseResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = ParseResult::default();
        let mut current: Option<OptionRecord> = None;

        for (index, raw) in args.into_iter().enumerate() {
            let token = raw.as_ref();

            if token.starts_with('-') {
                if let Some(record) = current.take() {
                    result.options.push(record);
                }

                let body = token.trim_start_matches('-');
                if body.is_empty() {
                    result.errors.push(format!("Invalid option '{}'", token));
                    continue;
                }

                let record = match body.find(['=', ':']) {
                    Some(split) if split > 0 => OptionRecord::new(
                        &body[..split],
                        [unquote(&body[split + 1..]).to_string()],
                    ),
                    Some(_) => {
                        result.errors.push(format!("Invalid option '{}'", token));
                        continue;
                    }
                    None => OptionRecord::new(body, Vec::<String>::new()),
                };
                current = Some(record);
                continue;
            }

            match current.as_mut() {
                Some(record) => record.arguments.push(unquote(token).to_string()),
                None if index == 0 => result.tool_name = Some(unquote(token).to_string()),
                None => result
                    .errors
                    .push(format!("Unexpected argument '{}'", token)),
            }
        }

        if let Some(record) = current.take() {
            result.options.push(record);
        }

        tracing::debug!(
            target: "command_line",
            options = result.options.len(),
            errors = result.errors.len(),
            tool = ?result.tool_name,
            "Command line tokenized"
        );

        result
    }
}

fn unquote(token: &str) -> &str {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return &token[1..token.len() - 1];
        }
    }
    token
}
