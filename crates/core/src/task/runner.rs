/// A long-lived unit of work driven to completion by a binary.
pub trait Runner {
    type Error;
    fn run(self) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send
    where
        Self: Sized;
}
