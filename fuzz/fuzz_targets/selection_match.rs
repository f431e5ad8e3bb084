#![no_main]

use libfuzzer_sys::fuzz_target;
use tau_interactivity::{
    text_equals, ChannelId, InboundMessage, MatchVerdict, MessageId, ReplyMatcher, Selection,
    UserId,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let mut lines = raw.lines();
    let Some(reply) = lines.next() else {
        return;
    };
    let possibilities = lines.take(16).map(str::to_string).collect::<Vec<_>>();
    let case_sensitive = data.first().is_some_and(|byte| byte & 1 == 1);

    let Ok(selection) = Selection::builder()
        .values(0..possibilities.len())
        .possibilities(possibilities.clone())
        .allow_cancel(true)
        .case_sensitive(case_sensitive)
        .build()
    else {
        assert!(possibilities.is_empty());
        return;
    };

    let message = InboundMessage::new(MessageId(1), ChannelId(1), UserId(1), reply);
    match selection.match_reply(&message, "cancel") {
        MatchVerdict::Matched(index) => {
            let possibility = &selection.possibilities()[index];
            assert!(text_equals(message.reply_text(), possibility, case_sensitive));
            assert!(selection.possibilities()[..index]
                .iter()
                .all(|earlier| !text_equals(message.reply_text(), earlier, case_sensitive)));
        }
        MatchVerdict::Cancelled => {
            assert!(text_equals(message.reply_text(), "cancel", case_sensitive));
        }
        MatchVerdict::Invalid => {
            assert!(selection.position_of(message.reply_text()).is_none());
        }
    }
});
