/// Async counterpart to the standard library's `TryFrom<T>` trait.
///
/// Useful when building a value requires I/O, such as hashing the contents
/// of a file behind a path.
///
/// # Examples
///
/// ```rust,ignore
/// struct LineCount(usize);
///
/// impl AsyncTryFrom<&Path> for LineCount {
///     type Error = std::io::Error;
///
///     async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
///         let bytes = compio::fs::read(path).await?;
///         Ok(LineCount(bytes.iter().filter(|b| **b == b'\n').count()))
///     }
/// }
/// ```
pub trait AsyncTryFrom<T>: Sized {
    /// The error type that can occur during conversion.
    type Error;

    /// Performs the fallible asynchronous conversion from `T` to `Self`.
    async fn async_try_from(value: T) -> Result<Self, Self::Error>;
}

/// Async counterpart to `TryInto<T>`.
pub trait AsyncTryInto<T> {
    /// The error type that can occur during conversion.
    type Error;

    /// Performs the fallible asynchronous conversion from `Self` to `T`.
    async fn async_try_into(self) -> Result<T, Self::Error>;
}

/// Blanket implementation for `AsyncTryInto<U>` when `U` implements `AsyncTryFrom<T>`.
impl<T, U> AsyncTryInto<U> for T
where
    U: AsyncTryFrom<T>,
{
    type Error = U::Error;

    async fn async_try_into(self) -> Result<U, Self::Error> {
        U::async_try_from(self).await
    }
}
