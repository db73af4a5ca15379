//! Inline keyboards for rendered drafts and menus.

use turtle_core::{Button, Keyboard};

use crate::action::Action;

pub const REGENERATE_LABEL: &str = "👎";
pub const APPROVE_LABEL: &str = "👍";
pub const SCHEDULE_LABEL: &str = "⏰";

const SHORT_LABEL_CHARS: usize = 2;
const SHORT_ROW_LEN: usize = 4;

/// Short labels (digits, single emoji) share rows of up to four; longer labels get their own row.
pub fn split_rows(buttons: Vec<Button>) -> Keyboard {
    let mut rows: Keyboard = Vec::new();
    let mut row: Vec<Button> = Vec::new();
    for button in buttons {
        if button.label.chars().count() <= SHORT_LABEL_CHARS {
            row.push(button);
            if row.len() == SHORT_ROW_LEN {
                rows.push(std::mem::take(&mut row));
            }
        } else {
            if !row.is_empty() {
                rows.push(std::mem::take(&mut row));
            }
            rows.push(vec![button]);
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

fn button(label: &str, action: Action) -> Button {
    Button::new(label, action.encode())
}

/// One numbered button per topic.
pub fn topic_keyboard(count: usize) -> Keyboard {
    split_rows(
        (1..=count)
            .map(|i| button(&i.to_string(), Action::SelectTopic(i)))
            .collect(),
    )
}

/// 👎 regenerate / 👍 approve pair.
pub fn review_keyboard(regenerate: Action, approve: Action) -> Keyboard {
    split_rows(vec![
        button(REGENERATE_LABEL, regenerate),
        button(APPROVE_LABEL, approve),
    ])
}

pub fn schedule_keyboard() -> Keyboard {
    split_rows(vec![button(SCHEDULE_LABEL, Action::Schedule)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(keyboard: &Keyboard) -> Vec<Vec<&str>> {
        keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.label.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_topic_keyboard_rows() {
        let keyboard = topic_keyboard(5);
        assert_eq!(labels(&keyboard), vec![vec!["1", "2", "3", "4"], vec!["5"]]);
        assert_eq!(keyboard[1][0].data, Action::SelectTopic(5).encode());
    }

    #[test]
    fn test_long_labels_take_own_row() {
        let keyboard = split_rows(vec![
            Button::new("1", "a"),
            Button::new("Regenerate", "b"),
            Button::new("2", "c"),
        ]);
        assert_eq!(labels(&keyboard), vec![vec!["1"], vec!["Regenerate"], vec!["2"]]);
    }

    #[test]
    fn test_review_keyboard() {
        let keyboard = review_keyboard(Action::RegenerateStory, Action::ApproveStory);
        assert_eq!(labels(&keyboard), vec![vec![REGENERATE_LABEL, APPROVE_LABEL]]);
        assert_eq!(keyboard[0][1].data, "turtle:approve_story");
    }
}
