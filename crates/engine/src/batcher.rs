use std::collections::HashMap;

/// Packs alert lines into messages no longer than `max_chars`.
#[derive(Debug, Clone, Copy)]
pub struct NotificationBatcher {
    max_chars: usize,
}

impl NotificationBatcher {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Greedily pack `lines` in order. Every message starts with `header` and
    /// each line is followed by `\n`. A line too long to share a message is
    /// sent on its own (and may exceed the budget).
    pub fn pack(&self, header: &str, lines: &[String]) -> Vec<String> {
        let header_len = header.chars().count();
        let mut messages = Vec::new();
        let mut current = String::from(header);
        let mut current_len = header_len;
        let mut has_lines = false;

        for line in lines {
            let line_len = line.chars().count() + 1;
            if has_lines && current_len + line_len > self.max_chars {
                messages.push(std::mem::replace(&mut current, String::from(header)));
                current_len = header_len;
            }
            current.push_str(line);
            current.push('\n');
            current_len += line_len;
            has_lines = true;
        }

        if has_lines {
            messages.push(current);
        }
        messages
    }
}

/// Alert lines of one cycle, grouped into titled sections in first-seen order.
#[derive(Debug, Default)]
pub struct AlertBook {
    sections: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl AlertBook {
    pub fn header(title: &str) -> String {
        format!("[{title}] conditions met\n---\n")
    }

    pub fn push(&mut self, title: &str, line: String) {
        let slot = match self.index.get(title) {
            Some(&slot) => slot,
            None => {
                self.sections.push((title.to_string(), Vec::new()));
                self.index.insert(title.to_string(), self.sections.len() - 1);
                self.sections.len() - 1
            }
        };
        self.sections[slot].1.push(line);
    }

    /// Every outgoing message, section by section.
    pub fn messages(&self, batcher: &NotificationBatcher) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|(title, lines)| batcher.pack(&Self::header(title), lines))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize, width: usize) -> Vec<String> {
        (0..n).map(|i| format!("{i:0width$}")).collect()
    }

    #[test]
    fn fits_in_one_message_when_small() {
        let batcher = NotificationBatcher::new(4000);
        let messages = batcher.pack("H\n", &lines(3, 4));
        assert_eq!(messages, vec!["H\n0000\n0001\n0002\n".to_string()]);
    }

    #[test]
    fn splits_at_budget_and_repeats_header() {
        // header 2 chars + each line 5 chars with newline: two lines per 12-char message
        let batcher = NotificationBatcher::new(12);
        let messages = batcher.pack("H\n", &lines(5, 4));
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.starts_with("H\n") && m.chars().count() <= 12));
        assert_eq!(messages[2], "H\n0004\n");
    }

    #[test]
    fn oversized_line_goes_alone() {
        let batcher = NotificationBatcher::new(10);
        let input = vec!["ab".to_string(), "x".repeat(30), "cd".to_string()];
        let messages = batcher.pack("", &input);
        assert_eq!(messages, vec!["ab\n".to_string(), format!("{}\n", "x".repeat(30)), "cd\n".to_string()]);
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        let batcher = NotificationBatcher::new(8);
        let input = vec!["상승상승".to_string(), "하락".to_string()];
        assert_eq!(batcher.pack("", &input).len(), 1);
    }

    #[test]
    fn no_lines_no_messages() {
        assert!(NotificationBatcher::new(100).pack("H\n", &[]).is_empty());
    }

    #[test]
    fn book_keeps_sections_in_first_seen_order() {
        let mut book = AlertBook::default();
        book.push("RSI(14) RSI Value < 30", "- BTCUSDT (5m): a".into());
        book.push("dip", "- ETHUSDT: b".into());
        book.push("RSI(14) RSI Value < 30", "- SOLUSDT (5m): c".into());

        let messages = book.messages(&NotificationBatcher::new(4000));
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            "[RSI(14) RSI Value < 30] conditions met\n---\n- BTCUSDT (5m): a\n- SOLUSDT (5m): c\n"
        );
        assert!(messages[1].starts_with("[dip] conditions met\n---\n"));
    }
}
