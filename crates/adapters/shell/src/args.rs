//! Argument string splitting.

use crate::error::ShellError;

/// Split a parameter string on whitespace, keeping single- or double-quoted
/// sections together.
pub(crate) fn split(params: &str) -> Result<Vec<String>, ShellError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;

    for c in params.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_arg = true;
            }
            None if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if quote.is_some() {
        return Err(ShellError::UnbalancedQuote(params.to_string()));
    }
    if in_arg {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_split_on_whitespace() {
        assert_eq!(split("  -c   1 host ").unwrap(), vec!["-c", "1", "host"]);
    }

    #[test]
    fn should_keep_quoted_sections_together_when_quoted() {
        assert_eq!(
            split(r#"-c "echo 'a b'" ''"#).unwrap(),
            vec!["-c", "echo 'a b'", ""]
        );
    }

    #[test]
    fn should_fail_when_quote_is_not_closed() {
        assert!(matches!(split("\"abc"), Err(ShellError::UnbalancedQuote(_))));
    }
}
