/// Named pipeline component.
///
/// The name is attached to log events emitted on behalf of the component.
pub trait Service {
    fn name(&self) -> &'static str;
}
