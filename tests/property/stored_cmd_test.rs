// tests/property/stored_cmd_test.rs

//! Property-based tests for captured commands
//! Tests that packing preserves arguments and that heap accounting tracks inline storage

use proptest::prelude::*;
use spinelshard::core::commands::{
    CmdArgVec, CommandFlags, CommandId, INLINE_ARG_COUNT, INLINE_BUFFER_CAPACITY, ReplyMode,
    StoredCmd,
};
use std::mem::size_of;
use std::sync::Arc;

fn cid() -> Arc<CommandId> {
    Arc::new(CommandId::new("rpush", -3, CommandFlags::WRITE, 1, 1))
}

fn arg_lists() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 0..10)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_owned_capture_preserves_arguments(args in arg_lists()) {
        let views: Vec<&[u8]> = args.iter().map(|a| a.as_slice()).collect();
        let cmd = StoredCmd::owned(cid(), &views, ReplyMode::OnlyErr);

        let mut scratch = CmdArgVec::new();
        prop_assert_eq!(cmd.arg_list(&mut scratch), views.as_slice());
        prop_assert_eq!(cmd.num_args(), views.len());
        prop_assert_eq!(cmd.reply_mode(), ReplyMode::OnlyErr);
        let first = cmd.first_arg();
        prop_assert_eq!(
            first.as_ref(),
            views.first().copied().unwrap_or_default()
        );
    }

    #[test]
    fn test_detaching_borrowed_command_keeps_arguments(args in arg_lists()) {
        let views: Vec<&[u8]> = args.iter().map(|a| a.as_slice()).collect();
        let borrowed = StoredCmd::borrowed(cid(), &views, ReplyMode::None);
        prop_assert_eq!(borrowed.used_memory(), 0);

        let owned = borrowed.to_owned_cmd();
        drop(borrowed);
        let mut scratch = CmdArgVec::new();
        prop_assert!(owned.is_owned());
        prop_assert_eq!(owned.arg_list(&mut scratch), views.as_slice());
        prop_assert_eq!(owned.reply_mode(), ReplyMode::None);
    }

    #[test]
    fn test_heap_accounting_matches_spill(args in arg_lists()) {
        let views: Vec<&[u8]> = args.iter().map(|a| a.as_slice()).collect();
        let cmd = StoredCmd::new(cid(), true, &views);

        let total: usize = views.iter().map(|a| a.len()).sum();
        let buffer = if total > INLINE_BUFFER_CAPACITY { total } else { 0 };
        let sizes = if views.len() > INLINE_ARG_COUNT {
            views.len() * size_of::<usize>()
        } else {
            0
        };
        prop_assert_eq!(cmd.used_memory(), buffer + sizes);
    }

    #[test]
    fn test_from_packed_splits_on_sizes(args in arg_lists()) {
        let sizes: Vec<usize> = args.iter().map(|a| a.len()).collect();
        let buffer: Vec<u8> = args.concat();
        let cmd = StoredCmd::from_packed(buffer, cid(), &sizes, ReplyMode::Full);

        let mut scratch = CmdArgVec::new();
        let views = cmd.arg_list(&mut scratch);
        prop_assert_eq!(views.len(), args.len());
        for (view, arg) in views.iter().zip(args.iter()) {
            prop_assert_eq!(*view, arg.as_slice());
        }
    }
}
