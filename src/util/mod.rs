pub(crate) use completion::CompletionGuard;

mod completion;
