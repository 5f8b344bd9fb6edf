use crate::record::Record;

/// Consumer of merged output.
///
/// `print` is called once per record in final output order. `done` is called
/// exactly once after the last record when the merge completes cleanly; a
/// failed merge never calls it.
pub trait RecordSink<T> {
  /// Receives the next record in merged order.
  fn print(&mut self, record: Record<T>);

  /// Signals that every source is exhausted and every record was printed.
  fn done(&mut self);
}

impl<T, K: RecordSink<T> + ?Sized> RecordSink<T> for &mut K {
  fn print(&mut self, record: Record<T>) {
    (**self).print(record);
  }

  fn done(&mut self) {
    (**self).done();
  }
}
