#![no_main]

use libfuzzer_sys::fuzz_target;
use packet_compat::core::version::{ClientVersion, ServerVersion, VersionPair};
use packet_compat::protocol::{decode, encode, ChatMessage, UpdateAttributes};

fuzz_target!(|data: &[u8]| {
    // First two bytes pick the version pair, the rest is the packet body
    if data.len() < 2 {
        return;
    }
    let server = ServerVersion::ALL[data[0] as usize % ServerVersion::ALL.len()];
    let client = ClientVersion::ALL[data[1] as usize % ClientVersion::ALL.len()];
    let versions = VersionPair::new(server, client);
    let body = &data[2..];

    // Anything that decodes must encode back to a decodable body
    if let Ok(decoded) = decode::<ChatMessage>(body, versions) {
        let packet = decoded.into_packet();
        let bytes = encode(&packet, versions).expect("decoded chat re-encodes");
        let again = decode::<ChatMessage>(&bytes, versions).expect("re-encoded chat decodes");
        assert_eq!(again.into_packet(), packet);
    }
    if let Ok(decoded) = decode::<UpdateAttributes>(body, versions) {
        let packet = decoded.into_packet();
        if let Ok(bytes) = encode(&packet, versions) {
            let _ = decode::<UpdateAttributes>(&bytes, versions);
        }
    }
});
