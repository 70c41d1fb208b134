//! 行过滤器
//!
//! - `LinePredicate`: 管线对每一行调用的判定接口，闭包自动实现
//! - `LineFilter`: Literal (memchr) / Regex 两种内置实现

use crate::kernel::services::ports::search::Result;
use memchr::memmem::Finder;

pub trait LinePredicate: Send + Sync {
    fn is_match(&self, line: &str) -> bool;
}

impl<F> LinePredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_match(&self, line: &str) -> bool {
        self(line)
    }
}

/// 编译好的行过滤器
#[derive(Clone)]
pub enum LineFilter {
    Literal {
        case_sensitive: bool,
        finder: Finder<'static>,
    },
    Regex {
        regex: regex::Regex,
    },
}

impl LineFilter {
    pub fn literal(pattern: &str, case_sensitive: bool) -> Self {
        let needle = if case_sensitive {
            pattern.as_bytes().to_vec()
        } else {
            pattern.to_lowercase().into_bytes()
        };

        Self::Literal {
            case_sensitive,
            finder: Finder::new(&needle).into_owned(),
        }
    }

    pub fn regex(pattern: &str, case_sensitive: bool) -> Result<Self> {
        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()?;
        Ok(Self::Regex { regex })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }
}

impl LinePredicate for LineFilter {
    fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Literal {
                case_sensitive,
                finder,
            } => {
                // 空 pattern 匹配所有行
                if finder.needle().is_empty() {
                    return true;
                }
                if *case_sensitive {
                    finder.find(line.as_bytes()).is_some()
                } else {
                    finder.find(line.to_lowercase().as_bytes()).is_some()
                }
            }
            Self::Regex { regex } => regex.is_match(line),
        }
    }
}

impl std::fmt::Debug for LineFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal {
                case_sensitive,
                finder,
            } => f
                .debug_struct("Literal")
                .field("needle", &String::from_utf8_lossy(finder.needle()))
                .field("case_sensitive", case_sensitive)
                .finish(),
            Self::Regex { regex } => f
                .debug_struct("Regex")
                .field("pattern", &regex.as_str())
                .finish(),
        }
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/filter.rs"]
mod tests;
