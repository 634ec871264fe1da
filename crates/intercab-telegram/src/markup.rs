// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of channel-agnostic keyboards into Telegram reply markup, and
//! message length limits.

use intercab_core::types::Keyboard;
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, ReplyMarkup,
};

/// Telegram's hard limit on message text length, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram's limit on `callback_data`, in bytes.
pub const MAX_CALLBACK_DATA: usize = 64;

/// Builds the reply markup for a keyboard.
pub fn to_reply_markup(keyboard: &Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<InlineKeyboardButton>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.to_string()))
                        .collect()
                })
                .collect();
            ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(rows))
        }
        Keyboard::Menu(rows) => {
            let rows: Vec<Vec<KeyboardButton>> = rows
                .iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect())
                .collect();
            ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard())
        }
        Keyboard::RequestContact(label) => {
            let button = KeyboardButton::new(label.clone()).request(ButtonRequest::Contact);
            ReplyMarkup::Keyboard(
                KeyboardMarkup::new(vec![vec![button]])
                    .resize_keyboard()
                    .one_time_keyboard(),
            )
        }
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

/// Cuts `text` to the platform limit on a character boundary.
pub fn fit_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_LENGTH) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intercab_core::action::Action;
    use intercab_core::types::Button;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn inline_buttons_carry_action_payloads() {
        let keyboard = Keyboard::Inline(vec![vec![
            Button::new("Take order", Action::Claim(100)),
            Button::new("Close", Action::CloseMessage),
        ]]);
        let ReplyMarkup::InlineKeyboard(markup) = to_reply_markup(&keyboard) else {
            panic!("expected inline keyboard");
        };
        let row = &markup.inline_keyboard[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].text, "Take order");
        match &row[0].kind {
            InlineKeyboardButtonKind::CallbackData(data) => assert_eq!(data, "take_100"),
            other => panic!("expected callback data, got {other:?}"),
        }
    }

    #[test]
    fn menu_becomes_reply_keyboard() {
        let keyboard = Keyboard::Menu(vec![vec!["New order".into(), "My orders".into()]]);
        let ReplyMarkup::Keyboard(markup) = to_reply_markup(&keyboard) else {
            panic!("expected reply keyboard");
        };
        assert_eq!(markup.keyboard[0][1].text, "My orders");
    }

    #[test]
    fn contact_request_asks_for_phone() {
        let ReplyMarkup::Keyboard(markup) =
            to_reply_markup(&Keyboard::RequestContact("Share phone number".into()))
        else {
            panic!("expected reply keyboard");
        };
        assert_eq!(
            markup.keyboard[0][0].request,
            Some(ButtonRequest::Contact)
        );
    }

    #[test]
    fn remove_clears_menu() {
        assert!(matches!(
            to_reply_markup(&Keyboard::Remove),
            ReplyMarkup::KeyboardRemove(_)
        ));
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "ж".repeat(MAX_MESSAGE_LENGTH + 10);
        let fitted = fit_message(&text);
        assert_eq!(fitted.chars().count(), MAX_MESSAGE_LENGTH);
        assert_eq!(fit_message("short"), "short");
    }

    #[test]
    fn longest_payload_fits_callback_limit() {
        let payload = Action::SearchDate(chrono::NaiveDate::from_ymd_opt(2026, 12, 31).unwrap())
            .to_string();
        assert!(payload.len() <= MAX_CALLBACK_DATA);
        assert!(Action::ApproveDriver(i64::MAX).to_string().len() <= MAX_CALLBACK_DATA);
    }
}
