#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use packet_compat::core::codec::FrameCodec;
use packet_compat::core::version::{ServerVersion, VersionPair};
use packet_compat::protocol::{PacketRegistry, VersionedCodec};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Fuzz stream framing and opcode routing
    let mut codec = FrameCodec::new(64 * 1024);
    let router = VersionedCodec::new(
        PacketRegistry::builtin(),
        VersionPair::native(ServerVersion::V1_16_5),
    );
    let mut buf = BytesMut::from(data);

    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        let _ = router.decode_frame(&frame);
    }
});
