/// A singly owned connection to an external service.
///
/// `connect` consumes the unconnected value and hands back the connected one,
/// so a client that failed to connect can never be used.
pub trait Client {
    type Error;
    fn connect(self) -> impl std::future::Future<Output = Result<Self, Self::Error>> + Send
    where
        Self: Sized;
}
