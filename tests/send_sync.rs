//! Send/Sync guarantees for types shared between producers and the sender.

use rstest::rstest;
use static_assertions::assert_impl_all;
use tochords::{
    ChordsClient, DeadLetterHook, DeliveryQueue, SenderConfig, SenderHandle, UreqTransport,
};

#[rstest]
fn shared_types_are_send_sync() {
    assert_impl_all!(DeliveryQueue: Send, Sync);
    assert_impl_all!(ChordsClient: Send, Sync);
    assert_impl_all!(SenderConfig: Send, Sync);
    assert_impl_all!(DeadLetterHook: Send, Sync);
}

#[rstest]
fn sender_side_types_are_send() {
    assert_impl_all!(SenderHandle: Send);
    assert_impl_all!(UreqTransport: Send);
}
