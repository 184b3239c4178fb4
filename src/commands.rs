/// Control-channel commands accepted from the host.

/// Out-of-band commands recognized on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  /// Take over immediately instead of waiting for the previous instance
  SkipWaiting,
  /// Purge every namespace, regardless of version
  ClearCache,
}

impl Command {
  /// Parse a raw host message.
  ///
  /// Unknown messages yield `None`; the worker ignores them.
  pub fn parse(raw: &str) -> Option<Command> {
    match raw.trim() {
      "SKIP_WAITING" => Some(Command::SkipWaiting),
      "CLEAR_CACHE" => Some(Command::ClearCache),
      _ => None,
    }
  }

  /// Wire name of the command.
  pub fn as_str(&self) -> &'static str {
    match self {
      Command::SkipWaiting => "SKIP_WAITING",
      Command::ClearCache => "CLEAR_CACHE",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_skip_waiting() {
    assert_eq!(Command::parse("SKIP_WAITING"), Some(Command::SkipWaiting));
  }

  #[test]
  fn test_parse_clear_cache() {
    assert_eq!(Command::parse("CLEAR_CACHE"), Some(Command::ClearCache));
  }

  #[test]
  fn test_surrounding_whitespace_is_tolerated() {
    assert_eq!(Command::parse("  CLEAR_CACHE\n"), Some(Command::ClearCache));
  }

  #[test]
  fn test_unknown_messages_are_none() {
    assert_eq!(Command::parse(""), None);
    assert_eq!(Command::parse("RELOAD"), None);
    // Wire names are case-sensitive
    assert_eq!(Command::parse("skip_waiting"), None);
  }

  #[test]
  fn test_round_trip_through_wire_name() {
    for command in [Command::SkipWaiting, Command::ClearCache] {
      assert_eq!(Command::parse(command.as_str()), Some(command));
    }
  }
}
