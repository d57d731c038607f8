use once_cell::sync::Lazy;
use regex::Regex;

/// Only links on this domain are considered group invitations.
pub const WOLT_DOMAIN: &str = "wolt.com";

static GROUP_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"/group/(?P<id>[A-Z0-9]+?)(?:$|/$)").unwrap());
static ORDER_ID_IN_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Wolt order ID (?P<id>[A-Z0-9]+?)[\s.$]").unwrap());

/// The group id in a group invitation link, e.g. `https://wolt.com/en/group/AB12CD` gives `AB12CD`.
pub fn group_id_from_link(url: &str) -> Option<String> {
    GROUP_LINK.captures(url).and_then(|c| c.name("id")).map(|m| m.as_str().to_string())
}

/// The order id mentioned in one of the bot's own rates or reminder messages.
pub fn order_id_from_message(text: &str) -> Option<String> {
    ORDER_ID_IN_MESSAGE.captures(text).and_then(|c| c.name("id")).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn find_group_ids_in_links() {
        assert_eq!(group_id_from_link("https://wolt.com/en/group/AB12CD"), Some("AB12CD".to_string()));
        assert_eq!(group_id_from_link("https://wolt.com/he/group/XYZ9/"), Some("XYZ9".to_string()));
        assert_eq!(group_id_from_link("https://wolt.com/en/group/ab12cd"), None);
        assert_eq!(group_id_from_link("https://wolt.com/en/group/AB12CD/join"), None);
        assert_eq!(group_id_from_link("https://wolt.com/en/isr/tel-aviv/restaurant/foo"), None);
        assert_eq!(group_id_from_link(""), None);
    }

    #[test]
    fn find_order_ids_in_messages() {
        let rates = "Rates for Wolt order ID ABC123 (including 10 NIS for delivery):\nA: 25.00\n";
        assert_eq!(order_id_from_message(rates), Some("ABC123".to_string()));
        let reminder = "Reminder, you should pay 12.00 nis to <@U1> for Wolt order ID Q7W8.\nIf you paid...";
        assert_eq!(order_id_from_message(reminder), Some("Q7W8".to_string()));
        // The id must be followed by whitespace or a period
        assert_eq!(order_id_from_message("Wolt order ID ABC123"), None);
        assert_eq!(order_id_from_message("Hey :) Just letting you know I joined the group ABC123"), None);
    }
}
