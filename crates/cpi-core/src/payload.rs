// Form body for the install transaction.
//
// Field order is fixed: appid, androiddeviceid, then the optional
// androidimei and macaddress. The endpoint only understands these names.

use url::form_urlencoded;

use crate::identifiers::DeviceIdentifiers;

pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub fn install_form(app_key: &str, ids: &DeviceIdentifiers) -> String {
    let mut form = form_urlencoded::Serializer::new(String::new());
    form.append_pair("appid", app_key)
        .append_pair("androiddeviceid", &ids.primary_id);

    if let Some(ref imei) = ids.secondary_id {
        form.append_pair("androidimei", imei);
    }
    if let Some(ref mac) = ids.mac_address {
        form.append_pair("macaddress", mac.as_str());
    }

    form.finish()
}
