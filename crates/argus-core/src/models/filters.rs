//! Inside-filter and e-mail notification leaves.
//!
//! Inside-filter leaves describe an org's own network footprint (used to
//! decide whether an event happened "inside" the org); the notification
//! leaves hold the addresses and times of day for digest e-mails. Each
//! value exists once and is shared by every org referencing it.

super::value_leaf! {
    InsideFilterAsn("inside_filter_asn") {
        asn: i64 = into_int,
        validated: &["asn"],
        orgs via "org_asn_link" ("asn" => "org_id")
    }
}

super::value_leaf! {
    InsideFilterCc("inside_filter_cc") {
        cc: String = into_str,
        validated: &["cc"],
        orgs via "org_cc_link" ("cc" => "org_id")
    }
}

super::value_leaf! {
    InsideFilterFqdn("inside_filter_fqdn") {
        fqdn: String = into_str,
        validated: &["fqdn"],
        orgs via "org_fqdn_link" ("fqdn" => "org_id")
    }
}

super::value_leaf! {
    InsideFilterIpNetwork("inside_filter_ip_network") {
        ip_network: String = into_str,
        validated: &["ip_network"],
        orgs via "org_ip_network_link" ("ip_network" => "org_id")
    }
}

super::value_leaf! {
    InsideFilterUrl("inside_filter_url") {
        url: String = into_str,
        validated: &["url"],
        orgs via "org_url_link" ("url" => "org_id")
    }
}

super::value_leaf! {
    /// A recipient address for e-mail notifications.
    EmailNotificationAddress("email_notification_address") {
        email: String = into_str,
        validated: &["email"],
        orgs via "org_notification_email_link" ("email" => "org_id")
    }
}

super::value_leaf! {
    /// A time of day (stored as `HH:MM:SS`) at which digests go out.
    EmailNotificationTime("email_notification_time") {
        notification_time: String = into_str,
        validated: &["notification_time"],
        orgs via "org_notification_time_link" ("notification_time" => "org_id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::value::Value;

    #[test]
    fn fqdn_leaf_normalizes_its_key() {
        let mut leaf = InsideFilterFqdn::default();
        leaf.apply("fqdn", Value::from("WWW.Example.COM.")).unwrap();
        assert_eq!(leaf.primary_key(), "www.example.com");
    }

    #[test]
    fn notification_time_accepts_short_form() {
        let mut leaf = EmailNotificationTime::default();
        leaf.apply("notification_time", Value::from("9:30")).unwrap();
        assert_eq!(leaf.notification_time(), "09:30:00");

        let err = leaf
            .apply("notification_time", Value::from("25:00"))
            .unwrap_err();
        assert_eq!(err.invalid_field(), Some("notification_time"));
    }

    #[test]
    fn address_leaf_rejects_non_addresses() {
        let mut leaf = EmailNotificationAddress::default();
        assert!(leaf.apply("email", Value::from("soc@example.org")).is_ok());
        assert!(leaf.apply("email", Value::from("soc@nodot")).is_err());
    }
}
